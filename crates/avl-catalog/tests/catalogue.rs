use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use avl_catalog::{CatalogError, enumerate, load_catalogue, render_markdown, save_catalogue};
use avl_sample::write_samples;
use avl_zarr::{FilesystemStore, Store, WriteOptions};
use uuid::Uuid;

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("avl_catalog_{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn populate(root: &Path) {
    write_samples(&root.join("cubes"), true, false, &WriteOptions::default())
        .expect("write samples");
    fs::create_dir_all(root.join("cubes/broken.zarr")).unwrap();
    write_samples(&root.join("a/b/c"), true, true, &WriteOptions::default())
        .expect("write deep archives");
}

#[tokio::test]
async fn enumerates_datasets_within_depth() {
    let root = temp_dir();
    populate(&root);
    let store: Arc<dyn Store> = Arc::new(FilesystemStore::new(&root));

    let catalogue = enumerate(store.clone(), 3).await.unwrap();
    let names: Vec<&str> = catalogue
        .entries
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["broken.zarr", "dataset_global.zarr", "dataset_utm33n.zarr"]
    );

    let global = &catalogue.entries[1];
    assert_eq!(global.title.as_deref(), Some("AVL global test dataset"));
    assert_eq!(global.variables, vec!["var_a", "var_b"]);
    assert_eq!(global.dimensions.get("lon"), Some(&450));
    assert_eq!(global.keywords, vec!["ESA", "AVL", "Agriculture", "EO"]);
    assert_eq!(global.bbox, Some([-180.0, -90.0, 180.0, 90.0]));
    assert!(global.crs.is_none());
    assert_eq!(
        catalogue.entries[2].crs.as_deref(),
        Some("transverse_mercator")
    );
    assert!(catalogue.entries[0].error.is_some());

    let deeper = enumerate(store, 4).await.unwrap();
    assert_eq!(deeper.entries.len(), 5);
    let archive = deeper
        .entries
        .iter()
        .find(|entry| entry.name == "dataset_utm33n.zarr.zip")
        .expect("archive entry");
    assert!(archive.error.is_none());
    assert_eq!(archive.crs.as_deref(), Some("transverse_mercator"));

    fs::remove_dir_all(root).ok();
}

#[tokio::test]
async fn cache_round_trip_and_markdown() {
    let root = temp_dir();
    populate(&root);
    let store: Arc<dyn Store> = Arc::new(FilesystemStore::new(&root));
    let catalogue = enumerate(store, 3).await.unwrap();

    let cache = root.join("catalogue.json");
    save_catalogue(&cache, &catalogue).unwrap();
    let loaded = load_catalogue(&cache).unwrap();
    assert_eq!(loaded.source, catalogue.source);
    assert_eq!(loaded.generated_at, catalogue.generated_at);
    assert_eq!(loaded.entries.len(), 3);
    assert_eq!(loaded.entries[1], catalogue.entries[1]);

    let markdown = render_markdown(&loaded);
    assert!(markdown.starts_with("# AVL Dataset Catalogue"));
    assert!(markdown.contains("- datasets: 3"));
    assert!(markdown.contains("dataset_utm33n.zarr"));

    fs::remove_dir_all(root).ok();
}

#[test]
fn cache_violating_schema_is_rejected() {
    let root = temp_dir();
    let cache = root.join("catalogue.json");
    fs::write(
        &cache,
        r#"{"source": "s3://x", "generated_at": "now", "entries": [{"path": 1}]}"#,
    )
    .unwrap();

    let err = load_catalogue(&cache).unwrap_err();
    match err {
        CatalogError::InvalidCache { errors, .. } => {
            assert!(errors.iter().any(|error| error.starts_with("/entries/0")));
        }
        other => panic!("unexpected error: {other}"),
    }

    fs::remove_dir_all(root).ok();
}
