use super::{AmplitudeModel, RadialGrid};
use crate::domain::{AUGMENTED_WIDTH, FeatureBatch, InferenceError};
use faer::Mat;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to read model '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse model '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid model: {message}")]
    Invalid { message: String },
}

#[derive(Debug, Deserialize)]
struct LinearModelFile {
    #[serde(rename = "radialGrid")]
    radial_grid: RadialGrid,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    #[serde(rename = "logOutput", default)]
    log_output: bool,
}

/// `amplitude = W x + b` per record, optionally exponentiated when the
/// regressor was fitted in log space.
#[derive(Debug, Clone)]
pub struct LinearAmplitudeModel {
    radial_grid: RadialGrid,
    /// AUGMENTED_WIDTH x outputs, i.e. the transpose of the file layout.
    weights: Mat<f64>,
    bias: Vec<f64>,
    log_output: bool,
}

impl LinearAmplitudeModel {
    /// `weights` holds one row of `AUGMENTED_WIDTH` coefficients per output point.
    pub fn new(
        radial_grid: RadialGrid,
        weights: Vec<Vec<f64>>,
        bias: Vec<f64>,
        log_output: bool,
    ) -> Result<Self, ModelLoadError> {
        if weights.is_empty() {
            return Err(ModelLoadError::Invalid {
                message: "model has no output rows".to_string(),
            });
        }
        if let Some((index, row)) = weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != AUGMENTED_WIDTH)
        {
            return Err(ModelLoadError::Invalid {
                message: format!(
                    "weight row {} has {} coefficients; expected {}",
                    index,
                    row.len(),
                    AUGMENTED_WIDTH
                ),
            });
        }
        if bias.len() != weights.len() {
            return Err(ModelLoadError::Invalid {
                message: format!(
                    "bias has {} entries for {} weight rows",
                    bias.len(),
                    weights.len()
                ),
            });
        }

        let transposed = Mat::from_fn(AUGMENTED_WIDTH, weights.len(), |input, output| {
            weights[output][input]
        });
        Ok(Self {
            radial_grid,
            weights: transposed,
            bias,
            log_output,
        })
    }

    pub fn log_output(&self) -> bool {
        self.log_output
    }
}

impl AmplitudeModel for LinearAmplitudeModel {
    fn radial_grid(&self) -> &RadialGrid {
        &self.radial_grid
    }

    fn output_width(&self) -> usize {
        self.bias.len()
    }

    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<Vec<f64>>, InferenceError> {
        if batch.width() != self.weights.nrows() {
            return Err(InferenceError::failed(format!(
                "records have {} columns but the model expects {}",
                batch.width(),
                self.weights.nrows()
            )));
        }

        let inputs = Mat::from_fn(batch.len(), batch.width(), |row, column| {
            batch.record(row)[column]
        });
        let outputs = &inputs * &self.weights;

        let mut rows = Vec::with_capacity(batch.len());
        for row in 0..outputs.nrows() {
            let mut amplitudes = Vec::with_capacity(self.bias.len());
            for (column, bias) in self.bias.iter().enumerate() {
                let linear = outputs[(row, column)] + bias;
                let amplitude = if self.log_output { linear.exp() } else { linear };
                if !amplitude.is_finite() {
                    return Err(InferenceError::failed(format!(
                        "model produced a non-finite amplitude at row {}, point {}",
                        row, column
                    )));
                }
                amplitudes.push(amplitude);
            }
            rows.push(amplitudes);
        }
        Ok(rows)
    }
}

pub fn load_linear_model(path: &Path) -> Result<LinearAmplitudeModel, ModelLoadError> {
    let content = fs::read_to_string(path).map_err(|source| ModelLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: LinearModelFile =
        serde_json::from_str(&content).map_err(|source| ModelLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(
        path = %path.display(),
        grid_points = file.radial_grid.len(),
        outputs = file.weights.len(),
        "loaded linear amplitude model"
    );
    LinearAmplitudeModel::new(file.radial_grid, file.weights, file.bias, file.log_output)
}

#[cfg(test)]
mod tests {
    use super::{LinearAmplitudeModel, ModelLoadError, load_linear_model};
    use crate::domain::{AuxiliaryParams, FeatureBatch};
    use crate::ingest::{RawPayload, ingest};
    use crate::predict::{AmplitudeModel, RadialGrid};
    use crate::validate::FeatureValidator;
    use std::fs;
    use tempfile::TempDir;

    fn batch(first_feature: f64, x_bj: f64) -> FeatureBatch {
        let mut record = vec![1.0e-3; 101];
        record[0] = first_feature;
        let payload = ingest(&RawPayload::Vector(record)).expect("payload should ingest");
        FeatureValidator::default()
            .validate(&payload, Some(AuxiliaryParams::new(2.0, x_bj)))
            .expect("batch should validate")
    }

    fn unit_row(column: usize, weight: f64) -> Vec<f64> {
        let mut row = vec![0.0; 103];
        row[column] = weight;
        row
    }

    #[test]
    fn linear_model_applies_weights_and_bias() {
        let grid = RadialGrid::new(vec![0.1, 1.0, 10.0]).expect("grid should be valid");
        let model = LinearAmplitudeModel::new(
            grid,
            vec![unit_row(0, 100.0), unit_row(101, 1.0), unit_row(102, 1000.0)],
            vec![0.5, 0.0, -1.0],
            false,
        )
        .expect("model should build");

        let rows = model
            .predict(&batch(2.0e-3, 4.0e-3))
            .expect("prediction should succeed");
        assert_eq!(rows.len(), 1);
        let expected = [0.7, 2.0, 3.0];
        for (actual, expected) in rows[0].iter().zip(expected) {
            assert!((actual - expected).abs() < 1.0e-12, "{actual} != {expected}");
        }
    }

    #[test]
    fn log_output_exponentiates_predictions() {
        let grid = RadialGrid::new(vec![1.0]).expect("grid should be valid");
        let model = LinearAmplitudeModel::new(grid, vec![vec![0.0; 103]], vec![-2.0], true)
            .expect("model should build");
        let rows = model
            .predict(&batch(1.0e-3, 1.0e-3))
            .expect("prediction should succeed");
        assert!((rows[0][0] - (-2.0_f64).exp()).abs() < 1.0e-15);
    }

    #[test]
    fn malformed_weights_are_rejected() {
        let grid = RadialGrid::new(vec![1.0, 2.0]).expect("grid should be valid");
        let error = LinearAmplitudeModel::new(
            grid.clone(),
            vec![vec![0.0; 103], vec![0.0; 101]],
            vec![0.0, 0.0],
            false,
        )
        .expect_err("short weight row should fail");
        assert!(error.to_string().contains("weight row 1 has 101 coefficients"));

        let error = LinearAmplitudeModel::new(grid, vec![vec![0.0; 103]], vec![0.0, 0.0], false)
            .expect_err("bias length should match");
        assert!(matches!(error, ModelLoadError::Invalid { .. }));
    }

    #[test]
    fn model_file_declares_grid_and_output_width_independently() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("model.json");
        let weights = vec![vec![0.0; 103]; 2];
        let content = serde_json::json!({
            "radialGrid": [0.1, 0.2, 0.3],
            "weights": weights,
            "bias": [1.0, 2.0],
        });
        fs::write(&path, content.to_string()).expect("model should be written");

        let model = load_linear_model(&path).expect("model should load");
        assert_eq!(model.radial_grid().len(), 3);
        assert_eq!(model.output_width(), 2);
        assert!(!model.log_output());
    }

    #[test]
    fn invalid_grid_in_model_file_fails_to_parse() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("model.json");
        fs::write(
            &path,
            r#"{ "radialGrid": [0.3, 0.2], "weights": [], "bias": [] }"#,
        )
        .expect("model should be written");

        let error = load_linear_model(&path).expect_err("decreasing grid should fail");
        assert!(matches!(error, ModelLoadError::Parse { .. }));
    }
}
