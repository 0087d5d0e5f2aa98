use crate::domain::AuxiliaryParams;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const PHYSICAL_LOWER_BOUND: f64 = 1.0e-7;
pub const PHYSICAL_UPPER_BOUND: f64 = 1.0e-2;

/// Half-open interval `(lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenClosedRange {
    pub lower: f64,
    pub upper: f64,
}

impl OpenClosedRange {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, value: f64) -> bool {
        value > self.lower && value <= self.upper
    }

    /// Nearest accepted value; NaN maps to the upper bound.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.upper;
        }
        value.clamp(next_above(self.lower), self.upper)
    }
}

impl Display for OpenClosedRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:e}, {:e}]", self.lower, self.upper)
    }
}

fn next_above(value: f64) -> f64 {
    if value == 0.0 {
        f64::from_bits(1)
    } else if value > 0.0 {
        f64::from_bits(value.to_bits() + 1)
    } else {
        f64::from_bits(value.to_bits() - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    #[serde(rename = "featureRange")]
    pub feature_range: OpenClosedRange,
    #[serde(rename = "xBjRange")]
    pub x_bj_range: OpenClosedRange,
    #[serde(rename = "c2Min")]
    pub c2_min: f64,
}

impl ValidationPolicy {
    /// Features and `x_Bj` both in `(1e-7, 1e-2]`.
    pub const fn physical() -> Self {
        Self {
            feature_range: OpenClosedRange::new(PHYSICAL_LOWER_BOUND, PHYSICAL_UPPER_BOUND),
            x_bj_range: OpenClosedRange::new(PHYSICAL_LOWER_BOUND, PHYSICAL_UPPER_BOUND),
            c2_min: 0.0,
        }
    }

    /// Features only need to be positive: `(0, 1e-2]`.
    pub const fn positive_features() -> Self {
        let mut policy = Self::physical();
        policy.feature_range.lower = 0.0;
        policy
    }

    pub fn accepts_c2(&self, c2: f64) -> bool {
        c2.is_finite() && c2 >= self.c2_min
    }

    /// Pulls user supplied values into the accepted region. The validator
    /// still checks the result.
    pub fn clamp_auxiliary(&self, aux: AuxiliaryParams) -> AuxiliaryParams {
        let c2 = if aux.c2.is_nan() {
            self.c2_min
        } else {
            aux.c2.clamp(self.c2_min, f64::MAX)
        };
        AuxiliaryParams::new(c2, self.x_bj_range.clamp(aux.x_bj))
    }

    fn check(&self) -> Result<(), String> {
        for (name, range) in [
            ("featureRange", self.feature_range),
            ("xBjRange", self.x_bj_range),
        ] {
            if !range.lower.is_finite() || !range.upper.is_finite() || range.lower >= range.upper
            {
                return Err(format!(
                    "{} must have finite bounds with lower < upper, got {}",
                    name, range
                ));
            }
        }
        if !self.c2_min.is_finite() {
            return Err(format!("c2Min must be finite, got {}", self.c2_min));
        }
        Ok(())
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::physical()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read validation policy '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse validation policy '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid validation policy '{}': {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

pub fn load_validation_policy(path: &Path) -> Result<ValidationPolicy, PolicyError> {
    let content = fs::read_to_string(path).map_err(|source| PolicyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let policy: ValidationPolicy =
        serde_json::from_str(&content).map_err(|source| PolicyError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    policy.check().map_err(|message| PolicyError::Invalid {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(policy)
}
