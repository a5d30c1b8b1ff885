use std::fs;
use std::path::PathBuf;

use avl_core::DataType;
use avl_sample::{SampleOptions, new_dataset, presets, write_samples};
use avl_verify::verify_dataset;
use avl_zarr::{FilesystemStore, OpenOptions, WriteOptions, ZipStore, open_dataset};
use uuid::Uuid;

fn temp_out_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("avl_sample_{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn full_size_presets_verify_clean() {
    for preset in presets(false).expect("presets") {
        let dataset = new_dataset(&preset.options).expect("build preset");
        assert_eq!(verify_dataset(&dataset), Vec::new(), "{}", preset.file_name);
    }
}

#[test]
fn global_preset_has_expected_layout() {
    let preset = presets(false).unwrap().remove(0);
    let dataset = new_dataset(&preset.options).unwrap();

    assert_eq!(dataset.dims().get("lon"), Some(&7200));
    assert_eq!(dataset.dims().get("lat"), Some(&3600));
    assert_eq!(dataset.dims().get("time"), Some(&5));
    let var_a = dataset.get("var_a").unwrap();
    assert_eq!(var_a.dtype, DataType::Float32);
    assert_eq!(var_a.chunks, vec![1, 720, 720]);
    assert!(var_a.values.is_none());
    assert_eq!(dataset.get("var_b").unwrap().dtype, DataType::UInt16);
    assert!(!dataset.contains("crs"));

    let lon = dataset.get("lon").unwrap().loaded_values().unwrap();
    assert!((lon[0] + 179.975).abs() < 1e-9);
    assert_eq!(dataset.attr_f64("geospatial_lon_resolution"), Some(0.05));
}

#[test]
fn utm_preset_carries_grid_mapping() {
    let preset = presets(true).unwrap().remove(1);
    let dataset = new_dataset(&preset.options).unwrap();
    let crs = dataset.get("crs").unwrap();
    assert_eq!(crs.attr_str("grid_mapping_name"), Some("transverse_mercator"));
    assert_eq!(
        dataset.get("var_a").unwrap().attr_str("grid_mapping"),
        Some("crs")
    );
    assert_eq!(
        dataset.get("x").unwrap().attr_str("standard_name"),
        Some("projection_x_coordinate")
    );
    let lon_min = dataset.attr_f64("geospatial_lon_min").unwrap();
    assert!(lon_min > 9.9 && lon_min <= 10.0);
}

#[test]
fn inverse_y_and_dropped_bounds() {
    let options = SampleOptions {
        xy_size: (4, 3),
        xy_res: (1.0, 1.0),
        xy_start: (0.0, 0.0),
        inverse_y: true,
        drop_bounds: true,
        ..SampleOptions::default()
    };
    let dataset = new_dataset(&options).unwrap();
    assert_eq!(
        dataset.get("lat").unwrap().loaded_values().unwrap(),
        &[2.5, 1.5, 0.5]
    );
    assert!(!dataset.contains("lat_bnds"));
    assert!(!dataset.get("lat").unwrap().has_attr("bounds"));
    assert_eq!(verify_dataset(&dataset), Vec::new());
}

#[tokio::test]
async fn written_samples_reopen_and_verify_clean() {
    let dir = temp_out_dir();
    let summaries =
        write_samples(&dir, true, true, &WriteOptions::default()).expect("write samples");
    assert_eq!(summaries.len(), 2);

    for name in ["dataset_global.zarr.zip", "dataset_utm33n.zarr.zip"] {
        let store = ZipStore::open(&dir.join(name)).expect("open archive");
        let dataset = open_dataset(&store, OpenOptions::default())
            .await
            .expect("open sample");
        assert_eq!(verify_dataset(&dataset), Vec::new(), "{name}");
    }

    fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn samples_can_be_written_as_directories() {
    let dir = temp_out_dir();
    write_samples(&dir, true, false, &WriteOptions::default()).expect("write samples");
    assert!(!dir.join("dataset_global.zarr.zip").exists());

    let store = FilesystemStore::new(dir.join("dataset_utm33n.zarr"));
    let dataset = open_dataset(&store, OpenOptions::default())
        .await
        .expect("open sample");
    assert_eq!(verify_dataset(&dataset), Vec::new());

    fs::remove_dir_all(dir).ok();
}
