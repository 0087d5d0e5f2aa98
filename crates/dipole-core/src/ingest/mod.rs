//! Payload ingestion: rank normalization and bare/augmented classification.

mod parser;

pub use parser::{PayloadFormat, decode_payload, read_payload};

use crate::domain::{DipoleError, DipoleResult, FeatureMatrix, RecordLayout};
use serde::{Deserialize, Serialize};

/// Untyped numeric payload as produced by an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPayload {
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

impl RawPayload {
    pub fn rank(&self) -> usize {
        match self {
            Self::Vector(_) => 1,
            Self::Matrix(_) => 2,
        }
    }
}

impl From<FeatureMatrix> for RawPayload {
    fn from(matrix: FeatureMatrix) -> Self {
        Self::Matrix(matrix.to_nested())
    }
}

/// Rank-2 payload whose width has been classified.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedPayload {
    layout: RecordLayout,
    matrix: FeatureMatrix,
}

impl IngestedPayload {
    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    pub fn rows(&self) -> usize {
        self.matrix.rows()
    }
}

pub fn ingest(raw: &RawPayload) -> DipoleResult<IngestedPayload> {
    let matrix = normalize_rank(raw)?;
    let width = matrix.cols();
    let layout = RecordLayout::from_width(width).ok_or(DipoleError::shape(width))?;
    tracing::debug!(rows = matrix.rows(), width, %layout, "ingested payload");
    Ok(IngestedPayload { layout, matrix })
}

fn normalize_rank(raw: &RawPayload) -> DipoleResult<FeatureMatrix> {
    match raw {
        RawPayload::Vector(values) => Ok(FeatureMatrix::single_row(values.clone())),
        RawPayload::Matrix(rows) => {
            let Some(first) = rows.first() else {
                return Err(DipoleError::deserialization("payload contains no rows"));
            };
            let width = first.len();
            if let Some((index, row)) = rows
                .iter()
                .enumerate()
                .find(|(_, row)| row.len() != width)
            {
                return Err(DipoleError::deserialization(format!(
                    "ragged payload: row {} has {} values but row 0 has {}",
                    index,
                    row.len(),
                    width
                )));
            }

            let values = rows.iter().flatten().copied().collect();
            FeatureMatrix::from_row_major(rows.len(), width, values).ok_or_else(|| {
                DipoleError::deserialization("payload dimensions overflow the address space")
            })
        }
    }
}
