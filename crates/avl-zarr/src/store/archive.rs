use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::ZarrResult;
use crate::store::{Listing, Store, join_key};

trait Archive: Read + Seek + Send {}

impl<T: Read + Seek + Send> Archive for T {}

/// A Zarr store packed into a zip archive (`*.zarr.zip`).
///
/// The group may sit at the archive root or below a single top-level
/// directory.
pub struct ZipStore {
    url: String,
    root: String,
    names: Vec<String>,
    archive: Mutex<ZipArchive<Box<dyn Archive>>>,
}

impl ZipStore {
    pub fn open(path: &Path) -> ZarrResult<Self> {
        let file = File::open(path)?;
        Self::new(path.display().to_string(), Box::new(file))
    }

    /// Open an archive already held in memory, e.g. a downloaded object.
    pub fn from_bytes(url: impl Into<String>, bytes: Vec<u8>) -> ZarrResult<Self> {
        Self::new(url.into(), Box::new(Cursor::new(bytes)))
    }

    fn new(url: String, reader: Box<dyn Archive>) -> ZarrResult<Self> {
        let archive = ZipArchive::new(reader)?;
        let names: Vec<String> = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect();
        let root = names
            .iter()
            .filter_map(|name| {
                if name == ".zgroup" {
                    Some("")
                } else {
                    name.strip_suffix("/.zgroup")
                }
            })
            .min_by_key(|root| root.len())
            .unwrap_or("")
            .to_string();
        Ok(Self {
            url,
            root,
            names,
            archive: Mutex::new(archive),
        })
    }
}

#[async_trait]
impl Store for ZipStore {
    fn url(&self) -> String {
        self.url.clone()
    }

    async fn get(&self, key: &str) -> ZarrResult<Option<Vec<u8>>> {
        let name = join_key(&self.root, key);
        let mut archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = match archive.by_name(&name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    async fn list_dir(&self, prefix: &str) -> ZarrResult<Listing> {
        let dir = join_key(&self.root, prefix);
        let mut listing = Listing::default();
        for name in &self.names {
            let rest = if dir.is_empty() {
                name.as_str()
            } else {
                match name.strip_prefix(&dir).and_then(|rest| rest.strip_prefix('/')) {
                    Some(rest) => rest,
                    None => continue,
                }
            };
            match rest.split_once('/') {
                Some((child, _)) => listing.prefixes.push(child.to_string()),
                None => listing.objects.push(rest.to_string()),
            }
        }
        listing.objects.sort();
        listing.objects.dedup();
        listing.prefixes.sort();
        listing.prefixes.dedup();
        Ok(listing)
    }
}

/// Writes a zip store next to its final path and moves it into place on
/// [`ZipStoreWriter::finish`].
pub struct ZipStoreWriter {
    path: PathBuf,
    partial: PathBuf,
    writer: ZipWriter<File>,
}

impl ZipStoreWriter {
    pub fn create(path: &Path) -> ZarrResult<Self> {
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        let writer = ZipWriter::new(File::create(&partial)?);
        Ok(Self {
            path: path.to_path_buf(),
            partial,
            writer,
        })
    }

    /// Add an entry; chunks are already compressed, so entries are stored.
    pub fn set(&mut self, key: &str, data: &[u8]) -> ZarrResult<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.writer.start_file(key, options)?;
        self.writer.write_all(data)?;
        Ok(())
    }

    pub fn finish(self) -> ZarrResult<()> {
        let file = self.writer.finish()?;
        file.sync_all()?;
        fs::rename(&self.partial, &self.path)?;
        Ok(())
    }
}

/// Whether `path` names a zip store.
pub fn is_zip_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("zip"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn reads_groups_below_a_top_level_directory() {
        let bytes = archive(&[
            ("demo.zarr/.zgroup", &b"{\"zarr_format\": 2}"[..]),
            ("demo.zarr/lon/.zarray", &b"{}"[..]),
            ("demo.zarr/lon/0", &b"chunk"[..]),
        ]);
        let store = ZipStore::from_bytes("demo.zarr.zip", bytes).unwrap();

        assert_eq!(store.get("lon/0").await.unwrap(), Some(b"chunk".to_vec()));
        assert_eq!(store.get("lat/0").await.unwrap(), None);

        let listing = store.list_dir("").await.unwrap();
        assert_eq!(listing.objects, vec![".zgroup".to_string()]);
        assert_eq!(listing.prefixes, vec!["lon".to_string()]);
        assert_eq!(
            store.list_dir("lon").await.unwrap().objects,
            vec![".zarray".to_string(), "0".to_string()]
        );
    }

    #[test]
    fn zip_paths_are_recognised_by_extension() {
        assert!(is_zip_path(Path::new("out/dataset_global.zarr.zip")));
        assert!(is_zip_path(Path::new("out/DATA.ZIP")));
        assert!(!is_zip_path(Path::new("out/dataset_global.zarr")));
    }
}
