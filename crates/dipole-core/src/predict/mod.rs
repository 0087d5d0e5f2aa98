mod grid;
mod linear;

pub use grid::{GridError, RadialGrid};
pub use linear::{LinearAmplitudeModel, ModelLoadError, load_linear_model};

use crate::domain::{DipoleError, DipoleResult, FeatureBatch, InferenceError};
use serde::Serialize;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Pre-trained regressor treated as an opaque capability.
pub trait AmplitudeModel: Send + Sync {
    fn radial_grid(&self) -> &RadialGrid;

    /// Number of amplitudes the model produces per record.
    fn output_width(&self) -> usize;

    /// One output row per input record, in input order.
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<Vec<f64>>, InferenceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionBatch {
    radial_grid: RadialGrid,
    rows: Vec<Vec<f64>>,
}

impl PredictionBatch {
    pub fn radial_grid(&self) -> &RadialGrid {
        &self.radial_grid
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Clone)]
pub struct PredictionAdapter {
    model: Arc<dyn AmplitudeModel>,
    timeout: Option<Duration>,
}

impl PredictionAdapter {
    pub fn new(model: Arc<dyn AmplitudeModel>) -> Self {
        Self {
            model,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn radial_grid(&self) -> &RadialGrid {
        self.model.radial_grid()
    }

    /// Fails when the declared output width disagrees with the grid.
    pub fn check_grid(&self) -> DipoleResult<()> {
        let expected = self.model.radial_grid().len();
        let got = self.model.output_width();
        if expected != got {
            return Err(DipoleError::GridMismatch { expected, got });
        }
        Ok(())
    }

    pub fn predict(&self, batch: &FeatureBatch) -> DipoleResult<PredictionBatch> {
        self.check_grid()?;
        let rows = self.infer(batch)?;

        if rows.len() != batch.len() {
            return Err(InferenceError::failed(format!(
                "model returned {} rows for {} records",
                rows.len(),
                batch.len()
            ))
            .into());
        }
        let expected = self.model.radial_grid().len();
        if let Some(row) = rows.iter().find(|row| row.len() != expected) {
            return Err(DipoleError::GridMismatch {
                expected,
                got: row.len(),
            });
        }

        tracing::debug!(rows = rows.len(), grid_points = expected, "prediction complete");
        Ok(PredictionBatch {
            radial_grid: self.model.radial_grid().clone(),
            rows,
        })
    }

    fn infer(&self, batch: &FeatureBatch) -> Result<Vec<Vec<f64>>, InferenceError> {
        let Some(limit) = self.timeout else {
            return self.model.predict(batch);
        };

        let (sender, receiver) = mpsc::channel();
        let model = Arc::clone(&self.model);
        let owned_batch = batch.clone();
        thread::Builder::new()
            .name("dipole-inference".to_string())
            .spawn(move || {
                let _ = sender.send(model.predict(&owned_batch));
            })
            .map_err(|error| {
                InferenceError::failed(format!("failed to start inference worker: {}", error))
            })?;

        match receiver.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(?limit, "model inference timed out; worker left detached");
                Err(InferenceError::Timeout { limit })
            }
            Err(RecvTimeoutError::Disconnected) => Err(InferenceError::failed(
                "inference worker stopped without producing a result",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AmplitudeModel, PredictionAdapter, RadialGrid};
    use crate::domain::{
        AuxiliaryParams, DipoleError, FeatureBatch, InferenceError,
    };
    use crate::ingest::{RawPayload, ingest};
    use crate::validate::FeatureValidator;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// Row i is filled with the first feature of record i.
    struct EchoModel {
        grid: RadialGrid,
        declared_width: usize,
        produced_width: usize,
        delay: Duration,
    }

    impl EchoModel {
        fn new(points: usize) -> Self {
            Self {
                grid: RadialGrid::logarithmic(1.0e-2, 10.0, points).expect("grid should build"),
                declared_width: points,
                produced_width: points,
                delay: Duration::ZERO,
            }
        }
    }

    impl AmplitudeModel for EchoModel {
        fn radial_grid(&self) -> &RadialGrid {
            &self.grid
        }

        fn output_width(&self) -> usize {
            self.declared_width
        }

        fn predict(&self, batch: &FeatureBatch) -> Result<Vec<Vec<f64>>, InferenceError> {
            thread::sleep(self.delay);
            Ok(batch
                .records()
                .map(|record| vec![record[0]; self.produced_width])
                .collect())
        }
    }

    struct FailingModel {
        grid: RadialGrid,
    }

    impl AmplitudeModel for FailingModel {
        fn radial_grid(&self) -> &RadialGrid {
            &self.grid
        }

        fn output_width(&self) -> usize {
            self.grid.len()
        }

        fn predict(&self, _batch: &FeatureBatch) -> Result<Vec<Vec<f64>>, InferenceError> {
            Err(InferenceError::failed("model file is corrupt"))
        }
    }

    fn batch_with_first_features(values: &[f64]) -> FeatureBatch {
        let rows = values
            .iter()
            .map(|value| {
                let mut record = vec![1.0e-3; 101];
                record[0] = *value;
                record
            })
            .collect();
        let payload = ingest(&RawPayload::Matrix(rows)).expect("payload should ingest");
        FeatureValidator::default()
            .validate(&payload, Some(AuxiliaryParams::default()))
            .expect("batch should validate")
    }

    #[test]
    fn predictions_preserve_input_order() {
        let adapter = PredictionAdapter::new(Arc::new(EchoModel::new(8)));
        for count in [1_usize, 2, 7] {
            let firsts: Vec<f64> = (0..count).map(|index| 1.0e-4 * (index + 1) as f64).collect();
            let predictions = adapter
                .predict(&batch_with_first_features(&firsts))
                .expect("prediction should succeed");

            assert_eq!(predictions.len(), count);
            for (index, first) in firsts.iter().enumerate() {
                let row = predictions.row(index).expect("row should exist");
                assert_eq!(row.len(), adapter.radial_grid().len());
                assert_eq!(row[0], *first);
            }
        }
    }

    #[test]
    fn declared_width_mismatch_fails_before_inference() {
        let mut model = EchoModel::new(8);
        model.declared_width = 6;
        let adapter = PredictionAdapter::new(Arc::new(model));

        let error = adapter
            .predict(&batch_with_first_features(&[1.0e-3]))
            .expect_err("mismatch should fail");
        assert_eq!(
            error,
            DipoleError::GridMismatch {
                expected: 8,
                got: 6
            }
        );
    }

    #[test]
    fn produced_row_length_is_checked_against_grid() {
        let mut model = EchoModel::new(8);
        model.produced_width = 9;
        let adapter = PredictionAdapter::new(Arc::new(model));

        let error = adapter
            .predict(&batch_with_first_features(&[1.0e-3, 2.0e-3]))
            .expect_err("short rows should fail");
        assert_eq!(
            error,
            DipoleError::GridMismatch {
                expected: 8,
                got: 9
            }
        );
    }

    #[test]
    fn model_failures_propagate_unchanged() {
        let grid = RadialGrid::new(vec![0.1, 1.0]).expect("grid should be valid");
        let adapter = PredictionAdapter::new(Arc::new(FailingModel { grid }));

        let error = adapter
            .predict(&batch_with_first_features(&[1.0e-3]))
            .expect_err("model failure should propagate");
        assert_eq!(
            error,
            DipoleError::Inference(InferenceError::failed("model file is corrupt"))
        );
    }

    #[test]
    fn slow_models_time_out() {
        let mut model = EchoModel::new(4);
        model.delay = Duration::from_millis(500);
        let adapter =
            PredictionAdapter::new(Arc::new(model)).with_timeout(Duration::from_millis(20));

        let error = adapter
            .predict(&batch_with_first_features(&[1.0e-3]))
            .expect_err("inference should time out");
        assert!(matches!(
            error,
            DipoleError::Inference(ref inference) if inference.is_timeout()
        ));
    }

    #[test]
    fn timeout_does_not_affect_fast_models() {
        let adapter = PredictionAdapter::new(Arc::new(EchoModel::new(4)))
            .with_timeout(Duration::from_secs(5));
        let predictions = adapter
            .predict(&batch_with_first_features(&[1.0e-3, 2.0e-3, 3.0e-3]))
            .expect("prediction should succeed");
        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions.row(2).expect("row should exist")[0], 3.0e-3);
    }
}
