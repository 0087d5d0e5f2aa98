mod commands;
mod helpers;

use clap::Parser;
use dipole_core::DipoleError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let (diagnostic, exit_code) = error.diagnostic();
            eprintln!("{}", diagnostic);
            eprintln!("FATAL EXIT CODE: {}", exit_code);
            exit_code
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("dipole-amplitude".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();

    match Cli::try_parse_from(&full_args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "dipole-amplitude",
    version,
    about = "Validate feature vectors and predict dipole amplitudes"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Validate a payload, run the model and write prediction artifacts
    Predict(commands::PredictArgs),
    /// Validate a payload without running a model
    Validate(commands::ValidateArgs),
    /// Print the radial grid declared by a model
    Grid(commands::GridArgs),
    /// Write a deterministic sample payload
    Sample(commands::SampleArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Predict(args) => commands::run_predict_command(args),
        CliCommand::Validate(args) => commands::run_validate_command(args),
        CliCommand::Grid(args) => commands::run_grid_command(args),
        CliCommand::Sample(args) => commands::run_sample_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(#[from] DipoleError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn diagnostic(&self) -> (String, i32) {
        match self {
            Self::Usage(message) => (
                format!("ERROR: [INPUT.CLI_USAGE] {}", message.trim_end()),
                2,
            ),
            Self::Compute(error) => (error.diagnostic_line(), error.exit_code()),
            Self::Internal(error) => (format!("ERROR: [IO.CLI] {error:#}"), 3),
        }
    }
}
