use thiserror::Error;

/// Errors emitted while reading or writing Zarr stores.
#[derive(Debug, Error)]
pub enum ZarrError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Core(#[from] avl_core::Error),
    #[error("not a zarr group: {0}")]
    NotAGroup(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("'{0}' already exists")]
    AlreadyExists(String),
    #[error("invalid metadata in '{key}': {reason}")]
    InvalidMetadata { key: String, reason: String },
    #[error("invalid chunk '{key}': {reason}")]
    InvalidChunk { key: String, reason: String },
    #[error("chunk of {len} byte(s) is not a multiple of the {size}-byte element size")]
    MisalignedChunk { len: usize, size: usize },
    #[error("unsupported data type '{0}'")]
    UnsupportedDtype(String),
    #[error("unsupported codec '{0}'")]
    UnsupportedCodec(String),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("invalid location '{0}'")]
    InvalidLocation(String),
    #[error("remote store error: {0}")]
    Remote(String),
}

pub type ZarrResult<T> = std::result::Result<T, ZarrError>;
