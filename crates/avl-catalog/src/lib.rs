//! Catalogue of AVL datasets stored below an object-store prefix.
//!
//! Enumerates `.zarr` groups, caches the result as schema-checked JSON and
//! renders it as Markdown.

pub mod cache;
pub mod enumerate;
pub mod errors;
pub mod model;
pub mod report;

pub use cache::{catalogue_schema, load_catalogue, save_catalogue};
pub use enumerate::{DEFAULT_MAX_DEPTH, enumerate};
pub use errors::{CatalogError, Result};
pub use model::{Catalogue, CatalogueEntry};
pub use report::render_markdown;
