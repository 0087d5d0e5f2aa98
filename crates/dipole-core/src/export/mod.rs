//! Download and plotting artifacts derived from a prediction batch.

use crate::domain::{DipoleError, DipoleResult};
use crate::predict::PredictionBatch;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const PREDICTIONS_JSON: &str = "predictions.json";
pub const PREDICTIONS_TABLE: &str = "predictions.dat";
pub const LOGLOG_TABLE: &str = "loglog_row0.dat";

const COLUMN_WIDTH: usize = 17;
const COLUMN_PRECISION: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub relative_path: PathBuf,
}

impl ExportArtifact {
    pub fn new(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }
}

/// `(ln r, ln amplitude)` pairs for one prediction row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLogSeries {
    pub points: Vec<[f64; 2]>,
    /// Grid indices whose amplitude had no real logarithm.
    pub skipped: Vec<usize>,
}

impl LogLogSeries {
    pub fn from_row(radii: &[f64], amplitudes: &[f64]) -> Self {
        let mut points = Vec::with_capacity(radii.len());
        let mut skipped = Vec::new();
        for (index, (radius, amplitude)) in radii.iter().zip(amplitudes).enumerate() {
            if *amplitude > 0.0 && amplitude.is_finite() {
                points.push([radius.ln(), amplitude.ln()]);
            } else {
                skipped.push(index);
            }
        }
        Self { points, skipped }
    }

    pub fn first_row(predictions: &PredictionBatch) -> Option<Self> {
        let row = predictions.row(0)?;
        Some(Self::from_row(predictions.radial_grid().points(), row))
    }
}

pub fn format_scientific_f64(value: f64, width: usize, precision: usize) -> String {
    format!(
        "{value:>width$.precision$e}",
        width = width,
        precision = precision
    )
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

pub fn render_prediction_json(predictions: &PredictionBatch) -> DipoleResult<String> {
    serde_json::to_string_pretty(predictions)
        .map_err(|error| DipoleError::io(format!("failed to serialize predictions: {}", error)))
}

/// Radius column followed by one amplitude column per prediction row.
pub fn render_prediction_table(predictions: &PredictionBatch) -> String {
    let mut table = format!(
        "# {} prediction rows on {} radial points\n# r",
        predictions.len(),
        predictions.radial_grid().len()
    );
    for index in 0..predictions.len() {
        table.push_str(&format!(" amplitude_{index}"));
    }
    table.push('\n');

    for (point, radius) in predictions.radial_grid().points().iter().enumerate() {
        table.push_str(&format_scientific_f64(*radius, COLUMN_WIDTH, COLUMN_PRECISION));
        for row in predictions.rows() {
            table.push_str(&format_scientific_f64(row[point], COLUMN_WIDTH, COLUMN_PRECISION));
        }
        table.push('\n');
    }
    table
}

pub fn render_loglog_table(series: &LogLogSeries) -> String {
    let mut table = String::from("# ln(r) ln(amplitude)\n");
    if !series.skipped.is_empty() {
        table.push_str(&format!(
            "# skipped {} non-positive amplitudes\n",
            series.skipped.len()
        ));
    }
    for [log_radius, log_amplitude] in &series.points {
        table.push_str(&format_scientific_f64(*log_radius, COLUMN_WIDTH, COLUMN_PRECISION));
        table.push_str(&format_scientific_f64(
            *log_amplitude,
            COLUMN_WIDTH,
            COLUMN_PRECISION,
        ));
        table.push('\n');
    }
    table
}

pub fn write_prediction_artifacts(
    output_dir: &Path,
    predictions: &PredictionBatch,
) -> DipoleResult<Vec<ExportArtifact>> {
    fs::create_dir_all(output_dir).map_err(|source| {
        DipoleError::io(format!(
            "failed to create output directory '{}': {}",
            output_dir.display(),
            source
        ))
    })?;

    let mut artifacts = Vec::with_capacity(3);
    write_artifact(
        output_dir,
        PREDICTIONS_JSON,
        &render_prediction_json(predictions)?,
        &mut artifacts,
    )?;
    write_artifact(
        output_dir,
        PREDICTIONS_TABLE,
        &render_prediction_table(predictions),
        &mut artifacts,
    )?;

    if let Some(series) = LogLogSeries::first_row(predictions) {
        if !series.skipped.is_empty() {
            tracing::warn!(
                skipped = series.skipped.len(),
                "first prediction row has non-positive amplitudes; omitted from log-log series"
            );
        }
        write_artifact(
            output_dir,
            LOGLOG_TABLE,
            &render_loglog_table(&series),
            &mut artifacts,
        )?;
    }

    Ok(artifacts)
}

fn write_artifact(
    output_dir: &Path,
    name: &str,
    content: &str,
    artifacts: &mut Vec<ExportArtifact>,
) -> DipoleResult<()> {
    let path = output_dir.join(name);
    write_text_artifact(&path, content).map_err(|source| {
        DipoleError::io(format!(
            "failed to write artifact '{}': {}",
            path.display(),
            source
        ))
    })?;
    tracing::info!(path = %path.display(), "wrote artifact");
    artifacts.push(ExportArtifact::new(name));
    Ok(())
}
