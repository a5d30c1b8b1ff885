use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use avl_core::{CRS_VAR_NAME, Dataset};

/// Listing of the datasets found below a store root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Catalogue {
    /// Enumerated root, e.g. `s3://bucket/prefix`.
    pub source: String,
    /// RFC 3339 UTC time of the enumeration.
    pub generated_at: String,
    pub entries: Vec<CatalogueEntry>,
}

/// Identifying metadata of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogueEntry {
    pub path: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, u64>,
    /// Data variable names.
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_coverage_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_coverage_end: Option<String>,
    /// `[lon_min, lat_min, lon_max, lat_max]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    /// Grid mapping name of the `crs` variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// Why the dataset could not be opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CatalogueEntry {
    /// Entry for a dataset that could not be read.
    pub fn unreadable(path: impl Into<String>, name: impl Into<String>, error: String) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            title: None,
            summary: None,
            keywords: Vec::new(),
            dimensions: BTreeMap::new(),
            variables: Vec::new(),
            time_coverage_start: None,
            time_coverage_end: None,
            bbox: None,
            crs: None,
            error: Some(error),
        }
    }

    pub fn from_dataset(
        path: impl Into<String>,
        name: impl Into<String>,
        dataset: &Dataset,
    ) -> Self {
        let text = |attr: &str| dataset.attr_str(attr).map(str::to_string);
        let keywords = match dataset.attr("keywords") {
            Some(Value::String(keywords)) => keywords
                .split(',')
                .map(str::trim)
                .filter(|keyword| !keyword.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::Array(keywords)) => keywords
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        let bbox = match (
            dataset.attr_f64("geospatial_lon_min"),
            dataset.attr_f64("geospatial_lat_min"),
            dataset.attr_f64("geospatial_lon_max"),
            dataset.attr_f64("geospatial_lat_max"),
        ) {
            (Some(lon_min), Some(lat_min), Some(lon_max), Some(lat_max)) => {
                Some([lon_min, lat_min, lon_max, lat_max])
            }
            _ => None,
        };

        Self {
            path: path.into(),
            name: name.into(),
            title: text("title"),
            summary: text("summary"),
            keywords,
            dimensions: dataset.dims(),
            variables: dataset
                .data_vars()
                .filter(|variable| variable.name != CRS_VAR_NAME)
                .map(|variable| variable.name.clone())
                .collect(),
            time_coverage_start: text("time_coverage_start"),
            time_coverage_end: text("time_coverage_end"),
            bbox,
            crs: dataset
                .get(CRS_VAR_NAME)
                .and_then(|crs| crs.attr_str("grid_mapping_name"))
                .map(str::to_string),
            error: None,
        }
    }
}
