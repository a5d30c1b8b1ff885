use std::path::PathBuf;

use thiserror::Error;

use crate::crs::CrsError;

/// Core error type shared across AVL crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The dataset violates internal invariants of the model.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
    /// The coordinate reference system could not be built or used.
    #[error("crs error: {0}")]
    Crs(#[from] CrsError),
    /// The path cannot name a file.
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A requested feature is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Convenience alias for results returned by AVL crates.
pub type Result<T> = std::result::Result<T, Error>;
