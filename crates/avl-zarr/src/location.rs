use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{ZarrError, ZarrResult};
use crate::store::{FilesystemStore, S3Options, S3Store, Store, ZipStore, is_zip_path};

/// Where a dataset lives: a local directory or zip file, or an S3 object
/// prefix or zip object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    S3 { bucket: String, key: String },
}

impl Location {
    /// Parse `s3://bucket/key`, `file://path` or a plain path.
    pub fn parse(value: &str) -> ZarrResult<Self> {
        if let Some(rest) = value.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(ZarrError::InvalidLocation(value.to_string()));
            }
            return Ok(Location::S3 {
                bucket: bucket.to_string(),
                key: key.trim_matches('/').to_string(),
            });
        }
        if let Some(path) = value.strip_prefix("file://") {
            return Ok(Location::Local(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = value.split_once("://") {
            return Err(ZarrError::Unsupported(format!(
                "'{scheme}' locations are not supported"
            )));
        }
        if value.is_empty() {
            return Err(ZarrError::InvalidLocation(value.to_string()));
        }
        Ok(Location::Local(PathBuf::from(value)))
    }

    /// Last path segment, e.g. `dataset.zarr`.
    pub fn name(&self) -> String {
        match self {
            Location::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Location::S3 { bucket, key } => key
                .rsplit('/')
                .find(|segment| !segment.is_empty())
                .unwrap_or(bucket)
                .to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::S3 { bucket, key } if key.is_empty() => write!(f, "s3://{bucket}"),
            Location::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

/// Open a store for `location`; local paths must exist.
///
/// Locations ending in `.zip` open as zip stores; an S3 zip object is
/// downloaded whole.
pub async fn open_store(location: &Location, s3: &S3Options) -> ZarrResult<Arc<dyn Store>> {
    match location {
        Location::Local(path) if is_zip_path(path) => {
            if !path.is_file() {
                return Err(ZarrError::NotFound(path.display().to_string()));
            }
            Ok(Arc::new(ZipStore::open(path)?))
        }
        Location::Local(path) => {
            if !path.is_dir() {
                return Err(ZarrError::NotFound(path.display().to_string()));
            }
            Ok(Arc::new(FilesystemStore::new(path.clone())))
        }
        Location::S3 { bucket, key } if is_zip_path(Path::new(key)) => {
            let (parent, name) = key.rsplit_once('/').unwrap_or(("", key));
            let store = S3Store::connect(bucket, parent, s3).await;
            let bytes = store
                .get(name)
                .await?
                .ok_or_else(|| ZarrError::NotFound(location.to_string()))?;
            Ok(Arc::new(ZipStore::from_bytes(location.to_string(), bytes)?))
        }
        Location::S3 { bucket, key } => Ok(Arc::new(S3Store::connect(bucket, key, s3).await)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s3_urls() {
        let location = Location::parse("s3://bucket/cubes/demo.zarr/").unwrap();
        assert_eq!(
            location,
            Location::S3 {
                bucket: "bucket".to_string(),
                key: "cubes/demo.zarr".to_string()
            }
        );
        assert_eq!(location.name(), "demo.zarr");
        assert_eq!(location.to_string(), "s3://bucket/cubes/demo.zarr");
    }

    #[test]
    fn plain_paths_are_local() {
        let location = Location::parse("out/dataset_global.zarr").unwrap();
        assert_eq!(location.name(), "dataset_global.zarr");
        assert!(matches!(location, Location::Local(_)));
    }

    #[tokio::test]
    async fn missing_zip_stores_are_not_found() {
        let location = Location::parse("no/such/dataset_global.zarr.zip").unwrap();
        let result = open_store(&location, &S3Options::default()).await;
        assert!(matches!(result, Err(ZarrError::NotFound(_))));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(Location::parse("gs://bucket/x.zarr").is_err());
        assert!(Location::parse("s3:///x.zarr").is_err());
    }
}
