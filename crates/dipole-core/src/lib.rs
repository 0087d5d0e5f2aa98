pub mod domain;
pub mod export;
pub mod ingest;
pub mod pipeline;
pub mod predict;
pub mod sample;
pub mod validate;

pub use domain::{DipoleError, DipoleResult};
pub use pipeline::{DipolePipeline, PredictionOutcome, PredictionRequest};
