use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use avl_core::Dataset;
use avl_zarr::store::join_key;
use avl_zarr::{OpenOptions, PrefixStore, Store, ZarrError, ZarrResult, ZipStore, open_dataset};

use crate::errors::Result;
use crate::model::{Catalogue, CatalogueEntry};

pub const DEFAULT_MAX_DEPTH: usize = 3;

const DATASET_SUFFIX: &str = ".zarr";
const ARCHIVE_SUFFIX: &str = ".zarr.zip";

/// Walk `store` from its root and describe every `.zarr` group and
/// `.zarr.zip` archive found.
///
/// Dataset prefixes are not descended into. At most `max_depth` levels are
/// listed, counting the root, which is always listed. Datasets that cannot
/// be opened are kept with their error.
pub async fn enumerate(store: Arc<dyn Store>, max_depth: usize) -> Result<Catalogue> {
    let source = store.url();
    let mut entries = Vec::new();
    let mut pending = vec![(String::new(), 0usize)];

    while let Some((prefix, depth)) = pending.pop() {
        let listing = store.list_dir(&prefix).await?;
        for object in listing.objects.iter().filter(|name| name.ends_with(ARCHIVE_SUFFIX)) {
            let key = join_key(&prefix, object);
            entries.push(describe_archive(&store, &key, object).await);
        }
        for child in listing.prefixes.iter().rev() {
            let key = join_key(&prefix, child);
            if child.ends_with(DATASET_SUFFIX) {
                entries.push(describe(&store, &key, child).await);
            } else if depth + 1 < max_depth {
                pending.push((key, depth + 1));
            }
        }
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    info!(
        event = "catalogue_enumerated",
        source = %source,
        datasets = entries.len(),
        max_depth
    );
    Ok(Catalogue {
        source,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        entries,
    })
}

async fn describe(store: &Arc<dyn Store>, key: &str, name: &str) -> CatalogueEntry {
    let dataset_store = PrefixStore::new(Arc::clone(store), key);
    let path = dataset_store.url();
    match open_dataset(&dataset_store, OpenOptions { load_coords: false }).await {
        Ok(dataset) => CatalogueEntry::from_dataset(path, name, &dataset),
        Err(err) => {
            warn!(event = "catalogue_entry_unreadable", path = %path, error = %err);
            CatalogueEntry::unreadable(path, name, err.to_string())
        }
    }
}

async fn describe_archive(store: &Arc<dyn Store>, key: &str, name: &str) -> CatalogueEntry {
    let path = PrefixStore::new(Arc::clone(store), key).url();
    match open_archive(store.as_ref(), key, &path).await {
        Ok(dataset) => CatalogueEntry::from_dataset(path, name, &dataset),
        Err(err) => {
            warn!(event = "catalogue_entry_unreadable", path = %path, error = %err);
            CatalogueEntry::unreadable(path, name, err.to_string())
        }
    }
}

async fn open_archive(store: &dyn Store, key: &str, path: &str) -> ZarrResult<Dataset> {
    let bytes = store
        .get(key)
        .await?
        .ok_or_else(|| ZarrError::NotFound(path.to_string()))?;
    let archive = ZipStore::from_bytes(path, bytes)?;
    open_dataset(&archive, OpenOptions { load_coords: false }).await
}
