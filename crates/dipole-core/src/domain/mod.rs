pub mod errors;

pub use errors::{
    DipoleError, DipoleResult, ErrorCategory, InferenceError, ValidationError,
    ValidationErrorKind,
};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const FEATURE_COUNT: usize = 101;
pub const BARE_WIDTH: usize = FEATURE_COUNT;
pub const AUGMENTED_WIDTH: usize = FEATURE_COUNT + 2;
pub const ACCEPTED_WIDTHS: [usize; 2] = [BARE_WIDTH, AUGMENTED_WIDTH];

/// Column holding `c2` in an augmented record.
pub const C2_COLUMN: usize = FEATURE_COUNT;
/// Column holding `x_Bj` in an augmented record.
pub const X_BJ_COLUMN: usize = FEATURE_COUNT + 1;

pub const DEFAULT_C2: f64 = 2.5;
pub const DEFAULT_X_BJ: f64 = 1.0e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLayout {
    Bare,
    Augmented,
}

impl RecordLayout {
    pub const fn from_width(width: usize) -> Option<Self> {
        match width {
            BARE_WIDTH => Some(Self::Bare),
            AUGMENTED_WIDTH => Some(Self::Augmented),
            _ => None,
        }
    }

    pub const fn width(self) -> usize {
        match self {
            Self::Bare => BARE_WIDTH,
            Self::Augmented => AUGMENTED_WIDTH,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bare => "bare",
            Self::Augmented => "augmented",
        }
    }
}

impl Display for RecordLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryParams {
    pub c2: f64,
    pub x_bj: f64,
}

impl AuxiliaryParams {
    pub const fn new(c2: f64, x_bj: f64) -> Self {
        Self { c2, x_bj }
    }

    pub fn from_record(record: &[f64]) -> Option<Self> {
        if record.len() != AUGMENTED_WIDTH {
            return None;
        }
        Some(Self::new(record[C2_COLUMN], record[X_BJ_COLUMN]))
    }
}

impl Default for AuxiliaryParams {
    fn default() -> Self {
        Self::new(DEFAULT_C2, DEFAULT_X_BJ)
    }
}

/// Dense row-major matrix of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// Returns `None` when `values.len() != rows * cols`.
    pub fn from_row_major(rows: usize, cols: usize, values: Vec<f64>) -> Option<Self> {
        (rows.checked_mul(cols) == Some(values.len())).then_some(Self { rows, cols, values })
    }

    pub fn single_row(values: Vec<f64>) -> Self {
        Self {
            rows: 1,
            cols: values.len(),
            values,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.cols;
        &self.values[start..start + self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |index| self.row(index))
    }

    pub fn to_nested(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(<[f64]>::to_vec).collect()
    }
}

/// Validated N x 103 model input. Only the validator builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    records: FeatureMatrix,
}

impl FeatureBatch {
    pub(crate) fn from_validated(records: FeatureMatrix) -> Self {
        debug_assert_eq!(records.cols(), AUGMENTED_WIDTH);
        debug_assert!(records.rows() >= 1);
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.records.rows() == 0
    }

    pub fn width(&self) -> usize {
        self.records.cols()
    }

    pub fn record(&self, index: usize) -> &[f64] {
        self.records.row(index)
    }

    pub fn features(&self, index: usize) -> &[f64] {
        &self.record(index)[..FEATURE_COUNT]
    }

    pub fn auxiliary(&self, index: usize) -> AuxiliaryParams {
        let record = self.record(index);
        AuxiliaryParams::new(record[C2_COLUMN], record[X_BJ_COLUMN])
    }

    pub fn records(&self) -> impl Iterator<Item = &[f64]> {
        self.records.iter_rows()
    }

    pub fn as_matrix(&self) -> &FeatureMatrix {
        &self.records
    }
}
