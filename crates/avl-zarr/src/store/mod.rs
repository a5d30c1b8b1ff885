//! Key/value access to Zarr stores.
//!
//! Keys are `/`-separated and relative to the store root; the empty key
//! denotes the root itself.

mod archive;
mod filesystem;
mod prefix;
mod s3;

use async_trait::async_trait;

use crate::errors::ZarrResult;

pub use archive::{ZipStore, ZipStoreWriter, is_zip_path};
pub use filesystem::FilesystemStore;
pub use prefix::PrefixStore;
pub use s3::{S3Options, S3Store};

/// Immediate children of a store prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Object names directly below the prefix, without the prefix.
    pub objects: Vec<String>,
    /// Child prefix names below the prefix, without the prefix or trailing `/`.
    pub prefixes: Vec<String>,
}

/// Read-only access to a Zarr store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Human-readable location of the store root.
    fn url(&self) -> String;

    /// Fetch an object, `None` when the key does not exist.
    async fn get(&self, key: &str) -> ZarrResult<Option<Vec<u8>>>;

    /// List the immediate children of `prefix`.
    async fn list_dir(&self, prefix: &str) -> ZarrResult<Listing>;
}

/// Join two store keys with a single `/`.
pub fn join_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let key = key.trim_start_matches('/');
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{key}"),
    }
}
