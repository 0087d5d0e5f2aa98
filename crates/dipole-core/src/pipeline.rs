use crate::domain::{AuxiliaryParams, DipoleResult, FeatureBatch, RecordLayout};
use crate::ingest::{RawPayload, ingest};
use crate::predict::{PredictionAdapter, PredictionBatch};
use crate::validate::FeatureValidator;

/// Everything one prediction needs, passed by value.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub payload: RawPayload,
    /// Required for bare payloads, ignored for augmented ones.
    pub aux: Option<AuxiliaryParams>,
}

impl PredictionRequest {
    pub fn new(payload: RawPayload, aux: Option<AuxiliaryParams>) -> Self {
        Self { payload, aux }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBatch {
    pub layout: RecordLayout,
    pub batch: FeatureBatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub layout: RecordLayout,
    pub batch: FeatureBatch,
    pub predictions: PredictionBatch,
}

#[derive(Clone)]
pub struct DipolePipeline {
    validator: FeatureValidator,
    adapter: PredictionAdapter,
}

impl DipolePipeline {
    pub fn new(validator: FeatureValidator, adapter: PredictionAdapter) -> Self {
        Self { validator, adapter }
    }

    pub fn validator(&self) -> &FeatureValidator {
        &self.validator
    }

    pub fn adapter(&self) -> &PredictionAdapter {
        &self.adapter
    }

    /// Ingest and validate without touching the model.
    pub fn prepare(&self, request: &PredictionRequest) -> DipoleResult<PreparedBatch> {
        prepare_batch(&self.validator, request)
    }

    pub fn run(&self, request: &PredictionRequest) -> DipoleResult<PredictionOutcome> {
        let PreparedBatch { layout, batch } = self.prepare(request)?;
        let predictions = self.adapter.predict(&batch)?;
        tracing::info!(
            rows = batch.len(),
            %layout,
            grid_points = predictions.radial_grid().len(),
            "prediction request complete"
        );
        Ok(PredictionOutcome {
            layout,
            batch,
            predictions,
        })
    }
}

pub fn prepare_batch(
    validator: &FeatureValidator,
    request: &PredictionRequest,
) -> DipoleResult<PreparedBatch> {
    let ingested = ingest(&request.payload)?;
    let batch = validator.validate(&ingested, request.aux)?;
    Ok(PreparedBatch {
        layout: ingested.layout(),
        batch,
    })
}
