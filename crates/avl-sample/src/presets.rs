use std::path::Path;

use serde_json::json;
use tracing::info;

use avl_core::{Attrs, Crs, DataType};
use avl_zarr::{WriteOptions, WriteSummary, write_dataset};

use crate::engine::new_dataset;
use crate::errors::Result;
use crate::model::{SampleOptions, VariableSpec};

/// A named sample dataset written by `avl new`.
#[derive(Debug, Clone)]
pub struct Preset {
    pub file_name: &'static str,
    pub options: SampleOptions,
}

fn attrs(value: serde_json::Value) -> Attrs {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Attrs::new(),
    }
}

/// A geophysical variable and a quality flags variable.
pub fn sample_variables() -> Vec<VariableSpec> {
    vec![
        VariableSpec::new(
            "var_a",
            DataType::Float32,
            attrs(json!({
                "long_name": "Variable A",
                "units": "mg/kg",
                "color_bar_name": "bone",
                "color_value_min": 0.0,
                "color_value_max": 0.75
            })),
        ),
        VariableSpec::new(
            "var_b",
            DataType::UInt16,
            attrs(json!({
                "long_name": "Variable B",
                "flag_meanings": "quality_good sensor_nonfunctional outside_valid_range",
                "flag_values": "1, 2, 3",
                "color_bar_name": "tab10",
                "color_value_min": 0,
                "color_value_max": 10
            })),
        ),
    ]
}

/// The global and UTM 33N presets; `small` shrinks the grids by 16x per axis
/// at the same extent.
pub fn presets(small: bool) -> Result<Vec<Preset>> {
    let scale = if small { 16 } else { 1 };

    let global = SampleOptions {
        xy_size: (7200 / scale, 3600 / scale),
        xy_tile_size: Some((720 / scale, 720 / scale)),
        xy_res: (0.05 * scale as f64, 0.05 * scale as f64),
        variables: sample_variables(),
        metadata: attrs(json!({
            "id": "dataset_global",
            "title": "AVL global test dataset"
        })),
        ..SampleOptions::default()
    };

    let utm = Crs::utm(33, true)?;
    let xy_start = utm.from_crs84(10.0, 52.0)?;
    let utm33n = SampleOptions {
        xy_size: (2048 / scale, 2048 / scale),
        xy_tile_size: Some((512 / scale, 512 / scale)),
        xy_names: ("x".to_string(), "y".to_string()),
        xy_units: ("m".to_string(), "m".to_string()),
        xy_res: (10.0 * scale as f64, 10.0 * scale as f64),
        xy_start,
        variables: sample_variables(),
        crs: Some(utm),
        metadata: attrs(json!({
            "id": "dataset_utm33n",
            "title": "AVL UTM zone 33N test dataset"
        })),
        ..SampleOptions::default()
    };

    Ok(vec![
        Preset {
            file_name: "dataset_global.zarr",
            options: global,
        },
        Preset {
            file_name: "dataset_utm33n.zarr",
            options: utm33n,
        },
    ])
}

/// Build every preset and write it below `dir`, as `*.zarr.zip` archives
/// when `zipped`, otherwise as `*.zarr` directories.
pub fn write_samples(
    dir: &Path,
    small: bool,
    zipped: bool,
    options: &WriteOptions,
) -> Result<Vec<WriteSummary>> {
    let mut summaries = Vec::new();
    for preset in presets(small)? {
        let path = if zipped {
            dir.join(format!("{}.zip", preset.file_name))
        } else {
            dir.join(preset.file_name)
        };
        info!(event = "sample_writing", path = %path.display());
        let dataset = new_dataset(&preset.options)?;
        summaries.push(write_dataset(&dataset, &path, options)?);
    }
    Ok(summaries)
}
