use super::CliError;
use super::helpers::*;
use dipole_core::domain::RecordLayout;
use dipole_core::export::{format_scientific_f64, write_prediction_artifacts};
use dipole_core::ingest::RawPayload;
use dipole_core::predict::{AmplitudeModel, PredictionAdapter};
use dipole_core::sample::{SampleSpec, generate_sample_payload};
use dipole_core::validate::FeatureValidator;
use dipole_core::{DipolePipeline, PredictionRequest};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(clap::Args)]
pub(super) struct PredictArgs {
    /// Feature payload (.json, .txt, .dat or .csv)
    #[arg(long)]
    input: PathBuf,

    /// Linear model JSON file
    #[arg(long)]
    model: PathBuf,

    #[command(flatten)]
    aux: AuxFlags,

    #[command(flatten)]
    policy: PolicyFlags,

    /// Abort inference after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Directory receiving the prediction artifacts
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct ValidateArgs {
    /// Feature payload (.json, .txt, .dat or .csv)
    #[arg(long)]
    input: PathBuf,

    #[command(flatten)]
    aux: AuxFlags,

    #[command(flatten)]
    policy: PolicyFlags,
}

#[derive(clap::Args)]
pub(super) struct GridArgs {
    /// Linear model JSON file
    #[arg(long)]
    model: PathBuf,

    /// Print the grid as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(super) enum LayoutArg {
    Bare,
    Augmented,
}

impl From<LayoutArg> for RecordLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Bare => RecordLayout::Bare,
            LayoutArg::Augmented => RecordLayout::Augmented,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct SampleArgs {
    /// Number of records to generate
    #[arg(long)]
    rows: usize,

    #[arg(long, value_enum, default_value = "bare")]
    layout: LayoutArg,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Output JSON path
    #[arg(long)]
    output: PathBuf,

    #[command(flatten)]
    policy: PolicyFlags,
}

pub(super) fn run_predict_command(args: PredictArgs) -> Result<i32, CliError> {
    let policy = args.policy.resolve()?;
    let aux = args.aux.resolve(&policy);
    let payload = read_input(&args.input)?;
    let model = load_model(&args.model)?;

    let mut adapter = PredictionAdapter::new(Arc::new(model));
    if let Some(limit) = args.timeout_ms {
        adapter = adapter.with_timeout(Duration::from_millis(limit));
    }
    let pipeline = DipolePipeline::new(FeatureValidator::new(policy), adapter);

    let outcome = pipeline.run(&PredictionRequest::new(payload, Some(aux)))?;
    let artifacts = write_prediction_artifacts(&args.output_dir, &outcome.predictions)?;

    println!(
        "Predicted {} {} record(s) on {} radial points.",
        outcome.predictions.len(),
        outcome.layout,
        outcome.predictions.radial_grid().len()
    );
    for artifact in artifacts {
        println!(
            "  {}",
            args.output_dir.join(&artifact.relative_path).display()
        );
    }
    Ok(0)
}

pub(super) fn run_validate_command(args: ValidateArgs) -> Result<i32, CliError> {
    let policy = args.policy.resolve()?;
    let aux = args.aux.resolve(&policy);
    let payload = read_input(&args.input)?;

    let validator = FeatureValidator::new(policy);
    let prepared =
        dipole_core::pipeline::prepare_batch(&validator, &PredictionRequest::new(payload, Some(aux)))?;

    println!(
        "PASS: {} {} record(s) accepted; batch width {}.",
        prepared.batch.len(),
        prepared.layout,
        prepared.batch.width()
    );
    Ok(0)
}

#[derive(Serialize)]
struct GridReport<'a> {
    #[serde(rename = "pointCount")]
    point_count: usize,
    #[serde(rename = "outputWidth")]
    output_width: usize,
    points: &'a [f64],
}

pub(super) fn run_grid_command(args: GridArgs) -> Result<i32, CliError> {
    let model = load_model(&args.model)?;
    let grid = model.radial_grid();

    if args.json {
        let report = GridReport {
            point_count: grid.len(),
            output_width: model.output_width(),
            points: grid.points(),
        };
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|error| CliError::Internal(error.into()))?;
        println!("{rendered}");
        return Ok(0);
    }

    for (index, radius) in grid.points().iter().enumerate() {
        println!("{:>5} {}", index, format_scientific_f64(*radius, 17, 8));
    }
    if model.output_width() != grid.len() {
        eprintln!(
            "WARNING: [RUN.GRID_MISMATCH] model emits {} values per record but declares {} radial points",
            model.output_width(),
            grid.len()
        );
    }
    Ok(0)
}

pub(super) fn run_sample_command(args: SampleArgs) -> Result<i32, CliError> {
    if args.rows == 0 {
        return Err(CliError::Usage(
            "Invalid row count '0'; expected a positive integer.".to_string(),
        ));
    }

    let policy = args.policy.resolve()?;
    let layout = RecordLayout::from(args.layout);
    let matrix = generate_sample_payload(
        SampleSpec {
            rows: args.rows,
            layout,
            seed: args.seed,
        },
        &policy,
    );
    write_json_file(&args.output, &RawPayload::from(matrix))?;

    println!(
        "Wrote {} {} record(s) to {}.",
        args.rows,
        layout,
        args.output.display()
    );
    Ok(0)
}
