use thiserror::Error;

/// Errors emitted while building, caching or loading a catalogue.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Core(#[from] avl_core::Error),
    #[error(transparent)]
    Zarr(#[from] avl_zarr::ZarrError),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("invalid catalogue cache '{path}':\n{}", .errors.join("\n"))]
    InvalidCache { path: String, errors: Vec<String> },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
