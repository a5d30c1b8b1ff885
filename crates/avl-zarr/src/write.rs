use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use avl_core::{Dataset, Values, Variable};

use crate::codec::{Compressor, encode_elements, encode_exact_elements, is_exact};
use crate::dtype::{ZarrDtype, encode_fill_value};
use crate::errors::{ZarrError, ZarrResult};
use crate::metadata::{
    ARRAY_DIMENSIONS, ArrayMetadata, ConsolidatedMetadata, GroupMetadata, ZARR_FORMAT, ZARRAY,
    ZATTRS, ZGROUP, ZMETADATA,
};
use crate::store::{FilesystemStore, ZipStoreWriter, is_zip_path, join_key};

/// Controls how `write_dataset` lays out the store.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub compressor: Option<Compressor>,
    /// Replace an existing store at the target path.
    pub overwrite: bool,
    /// Also write `.zmetadata`.
    pub consolidated: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compressor: Some(Compressor::default()),
            overwrite: false,
            consolidated: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub arrays: usize,
    pub chunks: u64,
    pub bytes: u64,
}

/// Destination of chunks and metadata documents.
enum Sink {
    Directory(FilesystemStore),
    Zip(ZipStoreWriter),
}

impl Sink {
    fn set(&mut self, key: &str, data: &[u8]) -> ZarrResult<()> {
        match self {
            Sink::Directory(store) => store.set(key, data),
            Sink::Zip(writer) => writer.set(key, data),
        }
    }

    fn set_metadata(&mut self, key: &str, data: &[u8]) -> ZarrResult<()> {
        match self {
            Sink::Directory(store) => store.set_atomic(key, data),
            Sink::Zip(writer) => writer.set(key, data),
        }
    }

    fn finish(self) -> ZarrResult<()> {
        match self {
            Sink::Directory(_) => Ok(()),
            Sink::Zip(writer) => writer.finish(),
        }
    }
}

/// Write `dataset` as a Zarr v2 store at `path`.
///
/// Paths ending in `.zip` get a zip store, which appears only once complete;
/// anything else gets a directory store. Only variables with values get
/// chunks; all others read back as their fill value. Directory metadata
/// documents are written atomically after the chunks.
pub fn write_dataset(
    dataset: &Dataset,
    path: &Path,
    options: &WriteOptions,
) -> ZarrResult<WriteSummary> {
    dataset.validate()?;

    if path.exists() {
        if !options.overwrite {
            return Err(ZarrError::AlreadyExists(path.display().to_string()));
        }
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
    }
    let mut sink = if is_zip_path(path) {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Sink::Zip(ZipStoreWriter::create(path)?)
    } else {
        fs::create_dir_all(path)?;
        Sink::Directory(FilesystemStore::new(path))
    };
    let mut summary = WriteSummary {
        path: path.to_path_buf(),
        ..WriteSummary::default()
    };

    let mut entries: BTreeMap<String, Value> = BTreeMap::new();
    entries.insert(
        ZGROUP.to_string(),
        serde_json::to_value(GroupMetadata::default())?,
    );
    entries.insert(ZATTRS.to_string(), Value::Object(dataset.attrs.clone()));

    for variable in dataset.variables.values() {
        let dtype = ZarrDtype::little_endian(variable.dtype);
        let meta = array_metadata(variable, &dtype, options)?;

        let chunks = match &variable.values {
            Some(Values::Loaded(values)) if is_exact(variable.dtype) => {
                let values: Vec<Option<i64>> = values
                    .iter()
                    .map(|value| value.is_finite().then_some(*value as i64))
                    .collect();
                exact_chunks(variable, &meta, &dtype, &values)?
            }
            Some(Values::Loaded(values)) => float_chunks(variable, &meta, &dtype, values)?,
            Some(Values::Exact(values)) => exact_chunks(variable, &meta, &dtype, values)?,
            Some(Values::Unavailable(_)) | None => Vec::new(),
        };
        let typesize = variable.dtype.size();
        for (chunk_index, raw) in chunks {
            let data = match &options.compressor {
                Some(compressor) => compressor.encode(&raw, typesize)?,
                None => raw,
            };
            sink.set(&join_key(&variable.name, &meta.chunk_key(&chunk_index)), &data)?;
            summary.chunks += 1;
            summary.bytes += data.len() as u64;
        }

        let mut attrs = variable.attrs.clone();
        attrs.insert(
            ARRAY_DIMENSIONS.to_string(),
            Value::from(variable.dims.clone()),
        );
        entries.insert(join_key(&variable.name, ZARRAY), serde_json::to_value(&meta)?);
        entries.insert(join_key(&variable.name, ZATTRS), Value::Object(attrs));
        summary.arrays += 1;
    }

    for (key, value) in &entries {
        let bytes = serde_json::to_vec_pretty(value)?;
        summary.bytes += bytes.len() as u64;
        sink.set_metadata(key, &bytes)?;
    }
    if options.consolidated {
        let bytes = serde_json::to_vec_pretty(&ConsolidatedMetadata::new(entries))?;
        summary.bytes += bytes.len() as u64;
        sink.set_metadata(ZMETADATA, &bytes)?;
    }
    sink.finish()?;

    info!(
        event = "zarr_written",
        path = %path.display(),
        arrays = summary.arrays,
        chunks = summary.chunks,
        bytes = summary.bytes
    );
    Ok(summary)
}

fn array_metadata(
    variable: &Variable,
    dtype: &ZarrDtype,
    options: &WriteOptions,
) -> ZarrResult<ArrayMetadata> {
    let chunks = variable
        .shape
        .iter()
        .zip(&variable.chunks)
        .map(|(size, chunk)| (*chunk).min(*size).max(1))
        .collect();
    Ok(ArrayMetadata {
        zarr_format: ZARR_FORMAT,
        shape: variable.shape.clone(),
        chunks,
        dtype: dtype.encode()?,
        compressor: options.compressor.as_ref().map(Compressor::to_config),
        fill_value: encode_fill_value(variable.fill_value, variable.dtype),
        order: "C".to_string(),
        filters: None,
        dimension_separator: None,
    })
}

fn float_chunks(
    variable: &Variable,
    meta: &ArrayMetadata,
    dtype: &ZarrDtype,
    values: &[f64],
) -> ZarrResult<Vec<(Vec<u64>, Vec<u8>)>> {
    let fill = variable.fill_value.unwrap_or(0.0);
    split_chunks(meta, values, fill)
        .into_iter()
        .map(|(index, buffer)| Ok((index, encode_elements(&buffer, dtype)?)))
        .collect()
}

fn exact_chunks(
    variable: &Variable,
    meta: &ArrayMetadata,
    dtype: &ZarrDtype,
    values: &[Option<i64>],
) -> ZarrResult<Vec<(Vec<u64>, Vec<u8>)>> {
    let fill = variable
        .fill_value
        .filter(|value| value.is_finite())
        .map(|value| value as i64);
    split_chunks(meta, values, fill)
        .into_iter()
        .map(|(index, buffer)| Ok((index, encode_exact_elements(&buffer, dtype)?)))
        .collect()
}

/// Cut C-ordered `values` into chunk buffers; edge chunks are padded with `fill`.
fn split_chunks<T: Copy>(meta: &ArrayMetadata, values: &[T], fill: T) -> Vec<(Vec<u64>, Vec<T>)> {
    let shape = &meta.shape;
    let chunks = &meta.chunks;
    let grid: Vec<u64> = shape
        .iter()
        .zip(chunks)
        .map(|(size, chunk)| size.div_ceil(*chunk))
        .collect();

    IndexIter::new(&grid)
        .map(|chunk_index| {
            let mut buffer = Vec::with_capacity(chunks.iter().product::<u64>() as usize);
            for local in IndexIter::new(chunks) {
                let mut flat = 0u64;
                let mut inside = true;
                for dim in 0..shape.len() {
                    let position = chunk_index[dim] * chunks[dim] + local[dim];
                    if position >= shape[dim] {
                        inside = false;
                        break;
                    }
                    flat = flat * shape[dim] + position;
                }
                buffer.push(if inside { values[flat as usize] } else { fill });
            }
            (chunk_index, buffer)
        })
        .collect()
}

/// Multi-indices of a grid in C order; a 0-D grid yields one empty index.
struct IndexIter<'a> {
    shape: &'a [u64],
    next: Option<Vec<u64>>,
}

impl<'a> IndexIter<'a> {
    fn new(shape: &'a [u64]) -> Self {
        let next = (!shape.contains(&0)).then(|| vec![0; shape.len()]);
        Self { shape, next }
    }
}

impl Iterator for IndexIter<'_> {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Vec<u64>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for dim in (0..following.len()).rev() {
            following[dim] += 1;
            if following[dim] < self.shape[dim] {
                self.next = Some(following);
                break;
            }
            following[dim] = 0;
        }
        Some(current)
    }
}
