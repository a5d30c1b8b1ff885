use avl_core::{Attrs, Crs, DataType};

/// A data variable to add to a sample dataset, shaped `(time, y, x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub dtype: DataType,
    pub attrs: Attrs,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, dtype: DataType, attrs: Attrs) -> Self {
        Self {
            name: name.into(),
            dtype,
            attrs,
        }
    }
}

/// Options for [`crate::new_dataset`]. Pairs are ordered `(x, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOptions {
    /// Number of grid cells.
    pub xy_size: (u64, u64),
    /// Spatial chunk size; whole axes when `None`.
    pub xy_tile_size: Option<(u64, u64)>,
    pub xy_names: (String, String),
    pub xy_dtype: DataType,
    pub xy_units: (String, String),
    pub xy_res: (f64, f64),
    /// Outer corner of the first grid cell.
    pub xy_start: (f64, f64),
    /// Make `y` decrease.
    pub inverse_y: bool,
    pub time_name: String,
    pub time_units: String,
    pub time_calendar: String,
    pub time_periods: u64,
    /// Step between time values, e.g. `1D` or `6H`.
    pub time_res: String,
    pub time_start: String,
    pub drop_bounds: bool,
    pub variables: Vec<VariableSpec>,
    /// Grid CRS; `None` means geographic coordinates without a `crs` variable.
    pub crs: Option<Crs>,
    /// Global attributes overriding the defaults.
    pub metadata: Attrs,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            xy_size: (3600, 1800),
            xy_tile_size: None,
            xy_names: ("lon".to_string(), "lat".to_string()),
            xy_dtype: DataType::Float64,
            xy_units: ("degrees_east".to_string(), "degrees_north".to_string()),
            xy_res: (0.1, 0.1),
            xy_start: (-180.0, -90.0),
            inverse_y: false,
            time_name: "time".to_string(),
            time_units: "seconds since 1970-01-01T00:00:00".to_string(),
            time_calendar: "proleptic_gregorian".to_string(),
            time_periods: 5,
            time_res: "1D".to_string(),
            time_start: "2010-01-01T00:00:00".to_string(),
            drop_bounds: false,
            variables: Vec::new(),
            crs: None,
            metadata: Attrs::new(),
        }
    }
}
