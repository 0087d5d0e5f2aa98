use std::fmt::{Display, Formatter};
use std::time::Duration;

use super::ACCEPTED_WIDTHS;

pub type DipoleResult<T> = Result<T, DipoleError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    MissingAuxiliaryParams,
    InvalidFeatureRange,
    InvalidXBjRange,
    InvalidC2,
}

impl ValidationErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingAuxiliaryParams => "MissingAuxiliaryParams",
            Self::InvalidFeatureRange => "InvalidFeatureRange",
            Self::InvalidXBjRange => "InvalidXBjRange",
            Self::InvalidC2 => "InvalidC2",
        }
    }

    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::MissingAuxiliaryParams => "INPUT.MISSING_AUX",
            Self::InvalidFeatureRange => "INPUT.FEATURE_RANGE",
            Self::InvalidXBjRange => "INPUT.XBJ_RANGE",
            Self::InvalidC2 => "INPUT.C2",
        }
    }
}

impl Display for ValidationErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Batch-level rejection: every row index failing `kind` is listed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} in {}: {detail}", describe_rows(.offending_rows))]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub offending_rows: Vec<usize>,
    pub detail: String,
}

impl ValidationError {
    pub fn new(
        kind: ValidationErrorKind,
        offending_rows: Vec<usize>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            offending_rows,
            detail: detail.into(),
        }
    }
}

fn describe_rows(rows: &[usize]) -> String {
    const LISTED_ROWS: usize = 8;
    let listed = rows
        .iter()
        .take(LISTED_ROWS)
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    match rows.len() {
        1 => format!("row {listed}"),
        count if count > LISTED_ROWS => {
            format!("rows {listed}, ... ({count} rows total)")
        }
        _ => format!("rows {listed}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    #[error("model inference failed: {cause}")]
    Failed { cause: String },
    #[error("model inference did not finish within {limit:?}")]
    Timeout { limit: Duration },
}

impl InferenceError {
    pub fn failed(cause: impl Into<String>) -> Self {
        Self::Failed {
            cause: cause.into(),
        }
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DipoleError {
    #[error("failed to deserialize payload: {message}")]
    Deserialization { message: String },
    #[error("invalid record width {got}; expected one of {expected:?} columns")]
    Shape { expected: [usize; 2], got: usize },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("radial grid has {expected} points but the model produces rows of {got} values")]
    GridMismatch { expected: usize, got: usize },
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("{message}")]
    Config { message: String },
    #[error("{message}")]
    Io { message: String },
}

impl DipoleError {
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }

    pub const fn shape(got: usize) -> Self {
        Self::Shape {
            expected: ACCEPTED_WIDTHS,
            got,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Deserialization { .. }
            | Self::Shape { .. }
            | Self::Validation(_)
            | Self::Config { .. } => ErrorCategory::InputValidationError,
            Self::GridMismatch { .. } | Self::Inference(_) => ErrorCategory::ComputationError,
            Self::Io { .. } => ErrorCategory::IoSystemError,
        }
    }

    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::Deserialization { .. } => "INPUT.DESERIALIZE",
            Self::Shape { .. } => "INPUT.SHAPE",
            Self::Validation(error) => error.kind.placeholder(),
            Self::GridMismatch { .. } => "RUN.GRID_MISMATCH",
            Self::Inference(InferenceError::Failed { .. }) => "RUN.INFERENCE",
            Self::Inference(InferenceError::Timeout { .. }) => "RUN.INFERENCE_TIMEOUT",
            Self::Config { .. } => "INPUT.CONFIG",
            Self::Io { .. } => "IO.ARTIFACT",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn validation_kind(&self) -> Option<ValidationErrorKind> {
        match self {
            Self::Validation(error) => Some(error.kind),
            _ => None,
        }
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder(), self)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}
