use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Severity level of an issue; `Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueSeverity {
    Warning,
    Error,
}

impl IssueSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueSeverity::Warning => "WARNING",
            IssueSeverity::Error => "ERROR",
        }
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueSeverity {
    type Err = VerifyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "WARNING" => Ok(IssueSeverity::Warning),
            "ERROR" => Ok(IssueSeverity::Error),
            _ => Err(VerifyError::InvalidLevel(value.to_string())),
        }
    }
}

/// A convention violation found in a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub message: String,
}

impl Issue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Failures that prevent verification from running.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Zarr(#[from] avl_zarr::ZarrError),
    #[error("invalid level '{0}', expected ERROR or WARNING")]
    InvalidLevel(String),
}
