use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use avl_core::write_bytes_atomic;

use crate::errors::ZarrResult;
use crate::store::{Listing, Store};

/// A Zarr store backed by a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of `key`; parent and current-dir segments are dropped.
    pub fn path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            match Path::new(segment).components().next() {
                Some(Component::Normal(_)) => path.push(segment),
                _ => continue,
            }
        }
        path
    }

    /// Write a chunk, creating parent directories as needed.
    pub fn set(&self, key: &str, data: &[u8]) -> ZarrResult<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }

    /// Write a metadata document atomically.
    pub fn set_atomic(&self, key: &str, data: &[u8]) -> ZarrResult<()> {
        write_bytes_atomic(&self.path(key), data)?;
        Ok(())
    }
}

#[async_trait]
impl Store for FilesystemStore {
    fn url(&self) -> String {
        self.root.display().to_string()
    }

    async fn get(&self, key: &str) -> ZarrResult<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_dir(&self, prefix: &str) -> ZarrResult<Listing> {
        let dir = self.path(prefix);
        let mut listing = Listing::default();
        if !dir.is_dir() {
            return Ok(listing);
        }

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                listing.prefixes.push(name);
            } else {
                listing.objects.push(name);
            }
        }
        listing.objects.sort();
        listing.prefixes.sort();
        Ok(listing)
    }
}
