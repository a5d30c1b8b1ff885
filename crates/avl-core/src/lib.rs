//! Core contracts and helpers for the AVL toolkit.
//!
//! This crate defines the in-memory dataset model, data types, CF grid
//! mappings backed by PROJ and the filesystem helpers shared by storage,
//! verification, sample generation and the CLI.

pub mod atomic;
pub mod crs;
pub mod dataset;
pub mod dtype;
pub mod error;

pub use atomic::{write_bytes_atomic, write_json_atomic};
pub use crs::{Crs, CrsError, GRID_MAPPINGS, GridMapping, grid_mapping};
pub use dataset::{Attrs, Dataset, Values, Variable};
pub use dtype::DataType;
pub use error::{Error, Result};

/// Name of the scalar variable that carries grid-mapping attributes.
pub const CRS_VAR_NAME: &str = "crs";
