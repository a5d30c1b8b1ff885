//! Synthetic datasets that follow the AVL convention.

pub mod engine;
pub mod errors;
pub mod geospatial;
pub mod model;
pub mod presets;
pub mod time;

pub use engine::{default_metadata, new_dataset};
pub use errors::{Result, SampleError};
pub use model::{SampleOptions, VariableSpec};
pub use presets::{Preset, presets, sample_variables, write_samples};
pub use time::TimeResolution;
