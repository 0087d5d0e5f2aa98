use super::CliError;
use anyhow::Context;
use dipole_core::domain::{AuxiliaryParams, DipoleError};
use dipole_core::ingest::{RawPayload, read_payload};
use dipole_core::predict::{LinearAmplitudeModel, load_linear_model};
use dipole_core::validate::{ValidationPolicy, load_validation_policy};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
pub(super) struct PolicyFlags {
    /// JSON validation policy; missing keys fall back to the physical preset
    #[arg(long, conflicts_with = "positive_features")]
    policy: Option<PathBuf>,

    /// Accept any positive feature value instead of requiring > 1e-7
    #[arg(long)]
    positive_features: bool,
}

impl PolicyFlags {
    pub(super) fn resolve(&self) -> Result<ValidationPolicy, CliError> {
        if let Some(path) = &self.policy {
            return load_validation_policy(path)
                .map_err(|error| CliError::Compute(DipoleError::config(error.to_string())));
        }
        if self.positive_features {
            Ok(ValidationPolicy::positive_features())
        } else {
            Ok(ValidationPolicy::physical())
        }
    }
}

#[derive(clap::Args)]
pub(super) struct AuxFlags {
    /// Structure parameter appended to bare records
    #[arg(long, default_value_t = dipole_core::domain::DEFAULT_C2, allow_negative_numbers = true)]
    c2: f64,

    /// Bjorken x appended to bare records
    #[arg(long = "x-bj", default_value_t = dipole_core::domain::DEFAULT_X_BJ, allow_negative_numbers = true)]
    x_bj: f64,

    /// Clamp --c2 and --x-bj into the accepted range instead of rejecting them
    #[arg(long)]
    clamp_aux: bool,
}

impl AuxFlags {
    pub(super) fn resolve(&self, policy: &ValidationPolicy) -> AuxiliaryParams {
        let aux = AuxiliaryParams::new(self.c2, self.x_bj);
        if !self.clamp_aux {
            return aux;
        }
        let clamped = policy.clamp_auxiliary(aux);
        if clamped != aux {
            tracing::warn!(
                c2 = clamped.c2,
                x_bj = clamped.x_bj,
                "auxiliary parameters clamped into the accepted range"
            );
        }
        clamped
    }
}

pub(super) fn read_input(path: &Path) -> Result<RawPayload, CliError> {
    read_payload(path).map_err(CliError::Compute)
}

pub(super) fn load_model(path: &Path) -> Result<LinearAmplitudeModel, CliError> {
    load_linear_model(path)
        .map_err(|error| CliError::Compute(DipoleError::config(error.to_string())))
}

pub(super) fn write_json_file<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    let mut content = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize '{}'", path.display()))?;
    content.push('\n');
    fs::write(path, content).with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}
