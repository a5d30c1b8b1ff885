use std::fs;
use std::path::Path;

use jsonschema::JSONSchema;
use schemars::schema_for;
use serde_json::Value;
use tracing::info;

use avl_core::write_json_atomic;

use crate::errors::{CatalogError, Result};
use crate::model::Catalogue;

/// JSON Schema of the cache file, generated from [`Catalogue`].
pub fn catalogue_schema() -> Result<Value> {
    Ok(serde_json::to_value(schema_for!(Catalogue))?)
}

/// Load a cached catalogue, rejecting documents that violate the schema.
pub fn load_catalogue(path: &Path) -> Result<Catalogue> {
    let content = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;

    let schema = catalogue_schema()?;
    let compiled =
        JSONSchema::compile(&schema).map_err(|err| CatalogError::Schema(err.to_string()))?;
    if let Err(errors) = compiled.validate(&document) {
        let errors = errors
            .map(|error| {
                let pointer = error.instance_path.to_string();
                let pointer = if pointer.is_empty() { "/".to_string() } else { pointer };
                format!("{pointer}: {error}")
            })
            .collect();
        return Err(CatalogError::InvalidCache {
            path: path.display().to_string(),
            errors,
        });
    }

    let catalogue: Catalogue = serde_json::from_value(document)?;
    info!(
        event = "catalogue_cache_loaded",
        path = %path.display(),
        datasets = catalogue.entries.len()
    );
    Ok(catalogue)
}

/// Write the catalogue atomically as pretty JSON.
pub fn save_catalogue(path: &Path, catalogue: &Catalogue) -> Result<()> {
    write_json_atomic(path, catalogue)?;
    info!(
        event = "catalogue_cache_written",
        path = %path.display(),
        datasets = catalogue.entries.len()
    );
    Ok(())
}
