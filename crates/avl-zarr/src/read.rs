use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use avl_core::{Attrs, DataType, Dataset, Values, Variable};

use crate::codec::{Compressor, NAT, decode_elements, decode_exact_elements, is_exact};
use crate::dtype::{ZarrDtype, parse_fill_value};
use crate::errors::{ZarrError, ZarrResult};
use crate::metadata::{
    ARRAY_DIMENSIONS, ArrayMetadata, ConsolidatedMetadata, GroupMetadata, ZARRAY, ZATTRS, ZGROUP,
    ZMETADATA, parse_document,
};
use crate::store::{Store, join_key};

/// Controls what `open_dataset` reads besides metadata.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    /// Load the values of 1-D dimension coordinates.
    pub load_coords: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self { load_coords: true }
    }
}

/// Open the Zarr group at the root of `store` as a dataset.
///
/// Metadata comes from `.zmetadata` when present, otherwise from the
/// individual `.zgroup`, `.zattrs` and `.zarray` documents. Coordinate
/// values that cannot be decoded are recorded as [`Values::Unavailable`]
/// instead of failing the whole open. 64-bit integer, datetime and
/// timedelta coordinates load as [`Values::Exact`].
pub async fn open_dataset(store: &dyn Store, options: OpenOptions) -> ZarrResult<Dataset> {
    let entries = match store.get(ZMETADATA).await? {
        Some(bytes) => {
            debug!(event = "zarr_consolidated", url = %store.url());
            ConsolidatedMetadata::from_slice(&bytes)?.metadata
        }
        None => scan_entries(store).await?,
    };

    let group = entries
        .get(ZGROUP)
        .cloned()
        .ok_or_else(|| ZarrError::NotAGroup(store.url()))?;
    let group: GroupMetadata = parse_document(ZGROUP, group)?;
    if group.zarr_format != 2 {
        return Err(ZarrError::Unsupported(format!(
            "zarr format {}",
            group.zarr_format
        )));
    }

    let mut dataset = Dataset::new().with_attrs(attrs_entry(&entries, ZATTRS)?);

    for (key, value) in &entries {
        let Some(name) = key.strip_suffix(&format!("/{ZARRAY}")) else {
            continue;
        };
        if name.contains('/') {
            continue;
        }

        let meta: ArrayMetadata = parse_document(key, value.clone())?;
        let mut attrs = attrs_entry(&entries, &join_key(name, ZATTRS))?;
        let dims = take_dimensions(key, &mut attrs)?;
        let dtype = ZarrDtype::parse(&meta.dtype)?;

        let mut variable = Variable::new(name, dtype.data_type, dims.as_slice(), meta.shape.clone())
            .with_chunks(meta.chunks.clone())
            .with_attrs(attrs);
        variable.fill_value = parse_fill_value(&meta.fill_value);

        if options.load_coords && variable.is_dimension_coord() {
            let values = match read_1d(store, name, &meta, &dtype).await {
                Ok(values) => values,
                Err(err) => {
                    warn!(
                        event = "zarr_values_unavailable",
                        variable = %name,
                        error = %err
                    );
                    Values::Unavailable(err.to_string())
                }
            };
            variable.values = Some(values);
        }

        dataset.insert(variable);
    }

    dataset.validate()?;
    debug!(
        event = "zarr_opened",
        url = %store.url(),
        variables = dataset.variables.len()
    );
    Ok(dataset)
}

async fn scan_entries(store: &dyn Store) -> ZarrResult<BTreeMap<String, Value>> {
    let mut entries = BTreeMap::new();
    let group = store
        .get(ZGROUP)
        .await?
        .ok_or_else(|| ZarrError::NotAGroup(store.url()))?;
    entries.insert(ZGROUP.to_string(), parse_json(ZGROUP, &group)?);
    if let Some(bytes) = store.get(ZATTRS).await? {
        entries.insert(ZATTRS.to_string(), parse_json(ZATTRS, &bytes)?);
    }

    for child in store.list_dir("").await?.prefixes {
        for document in [ZARRAY, ZATTRS] {
            let key = join_key(&child, document);
            if let Some(bytes) = store.get(&key).await? {
                let value = parse_json(&key, &bytes)?;
                entries.insert(key, value);
            }
        }
    }
    Ok(entries)
}

fn parse_json(key: &str, bytes: &[u8]) -> ZarrResult<Value> {
    serde_json::from_slice(bytes).map_err(|err| ZarrError::InvalidMetadata {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

fn attrs_entry(entries: &BTreeMap<String, Value>, key: &str) -> ZarrResult<Attrs> {
    match entries.get(key) {
        None => Ok(Attrs::new()),
        Some(Value::Object(attrs)) => Ok(attrs.clone()),
        Some(_) => Err(ZarrError::InvalidMetadata {
            key: key.to_string(),
            reason: "attributes must be a JSON object".to_string(),
        }),
    }
}

fn take_dimensions(key: &str, attrs: &mut Attrs) -> ZarrResult<Vec<String>> {
    let invalid = |reason: &str| ZarrError::InvalidMetadata {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    match attrs.remove(ARRAY_DIMENSIONS) {
        Some(Value::Array(dims)) => dims
            .into_iter()
            .map(|dim| match dim {
                Value::String(dim) => Ok(dim),
                _ => Err(invalid("dimension names must be strings")),
            })
            .collect(),
        Some(_) => Err(invalid("dimension names must be an array")),
        None => Err(invalid("missing _ARRAY_DIMENSIONS attribute")),
    }
}

/// Read every value of a 1-D array; missing chunks hold the fill value.
async fn read_1d(
    store: &dyn Store,
    name: &str,
    meta: &ArrayMetadata,
    dtype: &ZarrDtype,
) -> ZarrResult<Values> {
    if meta.shape.len() != 1 || meta.chunks.len() != 1 {
        return Err(ZarrError::Unsupported(format!(
            "reading values of {}-D array '{name}'",
            meta.shape.len()
        )));
    }
    if meta.filters.as_ref().is_some_and(|filters| !filters.is_empty()) {
        return Err(ZarrError::UnsupportedCodec("filters".to_string()));
    }
    let compressor = meta
        .compressor
        .as_ref()
        .map(Compressor::from_config)
        .transpose()?;

    let len = meta.shape[0];
    let chunk_len = meta.chunks[0].max(1);
    let exact = is_exact(dtype.data_type);
    let fill = parse_fill_value(&meta.fill_value).unwrap_or(f64::NAN);
    let exact_fill = meta
        .fill_value
        .as_i64()
        .filter(|value| dtype.data_type == DataType::Int64 || *value != NAT);
    let mut floats = Vec::new();
    let mut integers = Vec::new();

    for index in 0..len.div_ceil(chunk_len) {
        let key = join_key(name, &meta.chunk_key(&[index]));
        let take = (len - index * chunk_len).min(chunk_len) as usize;
        let Some(raw) = store.get(&key).await? else {
            if exact {
                integers.extend(std::iter::repeat_n(exact_fill, take));
            } else {
                floats.extend(std::iter::repeat_n(fill, take));
            }
            continue;
        };

        let bytes = match &compressor {
            Some(compressor) => compressor.decode(&raw)?,
            None => raw,
        };
        let invalid = |reason: String| ZarrError::InvalidChunk {
            key: key.clone(),
            reason,
        };
        let short = |found: usize| invalid(format!("holds {found} element(s), expected {take}"));
        if exact {
            let elements =
                decode_exact_elements(&bytes, dtype).map_err(|err| invalid(err.to_string()))?;
            if elements.len() < take {
                return Err(short(elements.len()));
            }
            integers.extend_from_slice(&elements[..take]);
        } else {
            let elements = decode_elements(&bytes, dtype).map_err(|err| invalid(err.to_string()))?;
            if elements.len() < take {
                return Err(short(elements.len()));
            }
            floats.extend_from_slice(&elements[..take]);
        }
    }

    Ok(if exact {
        Values::Exact(integers)
    } else {
        Values::Loaded(floats)
    })
}
