use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ZarrError, ZarrResult};

pub const ZGROUP: &str = ".zgroup";
pub const ZATTRS: &str = ".zattrs";
pub const ZARRAY: &str = ".zarray";
pub const ZMETADATA: &str = ".zmetadata";

/// Attribute holding the dimension names of an array, as written by xarray.
pub const ARRAY_DIMENSIONS: &str = "_ARRAY_DIMENSIONS";

pub const ZARR_FORMAT: u32 = 2;

/// Compressor entry of a `.zarray` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorConfig {
    pub id: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// Contents of a `.zarray` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayMetadata {
    pub zarr_format: u32,
    pub shape: Vec<u64>,
    pub chunks: Vec<u64>,
    pub dtype: String,
    pub compressor: Option<CompressorConfig>,
    pub fill_value: Value,
    pub order: String,
    pub filters: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_separator: Option<String>,
}

impl ArrayMetadata {
    pub fn separator(&self) -> &str {
        self.dimension_separator.as_deref().unwrap_or(".")
    }

    /// Key of the chunk at `index`, relative to the array.
    pub fn chunk_key(&self, index: &[u64]) -> String {
        if index.is_empty() {
            return "0".to_string();
        }
        index
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(self.separator())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub zarr_format: u32,
}

impl Default for GroupMetadata {
    fn default() -> Self {
        Self {
            zarr_format: ZARR_FORMAT,
        }
    }
}

/// Contents of a `.zmetadata` document: every metadata key of the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedMetadata {
    pub zarr_consolidated_format: u32,
    pub metadata: BTreeMap<String, Value>,
}

impl ConsolidatedMetadata {
    pub fn new(metadata: BTreeMap<String, Value>) -> Self {
        Self {
            zarr_consolidated_format: 1,
            metadata,
        }
    }

    pub fn from_slice(bytes: &[u8]) -> ZarrResult<Self> {
        let consolidated: Self = serde_json::from_slice(bytes).map_err(|err| {
            ZarrError::InvalidMetadata {
                key: ZMETADATA.to_string(),
                reason: err.to_string(),
            }
        })?;
        if consolidated.zarr_consolidated_format != 1 {
            return Err(ZarrError::InvalidMetadata {
                key: ZMETADATA.to_string(),
                reason: format!(
                    "unsupported consolidated format {}",
                    consolidated.zarr_consolidated_format
                ),
            });
        }
        Ok(consolidated)
    }
}

/// Parse a metadata document and report the offending key on failure.
pub fn parse_document<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> ZarrResult<T> {
    serde_json::from_value(value).map_err(|err| ZarrError::InvalidMetadata {
        key: key.to_string(),
        reason: err.to_string(),
    })
}
