//! Error types.
//!
//! - `ModelError` is what the library returns. Every variant is fatal: a
//!   partially-built model is never handed back to the caller.
//! - `AppError` is what the binary reports: a message plus a process exit code.

use thiserror::Error;

/// Typed failure of a model build or of one of its building blocks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Malformed, missing or contradictory configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Requested category boundary does not coincide with a bin edge.
    #[error("binning error: {0}")]
    Binning(String),

    /// Input histogram axes differ from the configured binning.
    #[error("axis mismatch: {0}")]
    AxisMismatch(String),

    /// Input histogram has no bins.
    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),

    #[error("parameter '{0}' not found")]
    NotFound(String),

    /// More than one transfer-function family is configured.
    #[error("ambiguous fit form: keys {0:?} are mutually exclusive")]
    AmbiguousFitForm(Vec<String>),

    /// No transfer-function family is configured.
    #[error("unknown fit form: expected one of SPLITPOLY, POLY, BASIS or FORM")]
    UnknownFitForm,

    #[error("invalid formula '{formula}': {reason}")]
    InvalidFormula { formula: String, reason: String },

    /// Shape morph requested against a zero nominal value.
    #[error("division by zero: {0}")]
    DivisionByZero(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl ModelError {
    /// Exit code used by the `rpf` binary for this kind of failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            ModelError::Config(_)
            | ModelError::AmbiguousFitForm(_)
            | ModelError::UnknownFitForm
            | ModelError::InvalidFormula { .. } => 2,
            ModelError::Binning(_) | ModelError::AxisMismatch(_) | ModelError::EmptyInput(_) => 3,
            ModelError::DuplicateParameter(_)
            | ModelError::NotFound(_)
            | ModelError::DivisionByZero(_) => 4,
            ModelError::Io(_) => 5,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
