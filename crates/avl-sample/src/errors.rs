use thiserror::Error;

/// Errors emitted while building or writing sample datasets.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("invalid time: {0}")]
    Time(String),
    #[error("crs error: {0}")]
    Crs(#[from] avl_core::CrsError),
    #[error(transparent)]
    Core(#[from] avl_core::Error),
    #[error(transparent)]
    Zarr(#[from] avl_zarr::ZarrError),
}

pub type Result<T> = std::result::Result<T, SampleError>;
