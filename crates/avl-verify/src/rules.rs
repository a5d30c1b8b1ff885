//! The AVL rule set.
//!
//! Each rule inspects a dataset and returns its issues in a fixed order.

use avl_core::{CRS_VAR_NAME, Crs, Dataset, Values, Variable};

use crate::errors::Issue;

pub type Rule = fn(&Dataset) -> Vec<Issue>;

/// Rules in evaluation order.
pub const RULES: &[Rule] = &[
    check_global_attrs,
    check_time_coord,
    check_xy_coords,
];

pub const EXPECTED_GLOBAL_ATTRS: [&str; 18] = [
    "Conventions",
    "title",
    "summary",
    "sources",
    "history",
    "keywords",
    "id",
    "time_coverage_start",
    "time_coverage_end",
    "time_coverage_resolution",
    "geospatial_lon_min",
    "geospatial_lon_max",
    "geospatial_lon_resolution",
    "geospatial_lon_units",
    "geospatial_lat_min",
    "geospatial_lat_max",
    "geospatial_lat_resolution",
    "geospatial_lat_units",
];

/// Attributes every quantity coordinate must carry.
const QUANTITY_ATTRS: [&str; 2] = ["standard_name", "units"];

const TIME: &str = "time";

#[derive(Debug, Clone, Copy)]
enum Monotonic {
    Increasing,
    IncreasingOrDecreasing,
}

pub fn check_global_attrs(dataset: &Dataset) -> Vec<Issue> {
    EXPECTED_GLOBAL_ATTRS
        .iter()
        .filter(|name| dataset.attr(name).is_none())
        .map(|name| Issue::warning(format!("missing global attribute '{name}'")))
        .collect()
}

pub fn check_time_coord(dataset: &Dataset) -> Vec<Issue> {
    let mut issues = check_variable(dataset, TIME);
    issues.extend(check_monotonic(dataset, TIME, Monotonic::Increasing));

    if dataset.get(TIME).is_some_and(|time| time.dims_are(&[TIME])) {
        for variable in dataset.variables.values() {
            if variable.ndim() > 1 && variable.has_dim(TIME) && variable.dims[0] != TIME {
                issues.push(Issue::error(format!(
                    "first dimension of variable '{}' must be '{TIME}', but dimensions are {}",
                    variable.name,
                    format_dims(&variable.dims)
                )));
            }
        }
    }

    issues
}

pub fn check_xy_coords(dataset: &Dataset) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut yx_dims: Option<(&str, &str)> = None;

    if let (Some(x), Some(y)) = (dataset.get("x"), dataset.get("y")) {
        issues.extend(check_variable(dataset, "x"));
        issues.extend(check_variable(dataset, "y"));
        if x.ndim() == 1 && y.ndim() == 1 {
            yx_dims = Some(("y", "x"));
            issues.extend(check_monotonic(dataset, "x", Monotonic::Increasing));
            issues.extend(check_monotonic(dataset, "y", Monotonic::IncreasingOrDecreasing));
            issues.extend(check_crs(dataset));
        } else {
            issues.push(Issue::error(
                "coordinate variables 'x' and 'y' must both be 1-D",
            ));
        }
    }

    if let (Some(lon), Some(lat)) = (dataset.get("lon"), dataset.get("lat")) {
        issues.extend(check_variable(dataset, "lon"));
        issues.extend(check_variable(dataset, "lat"));
        if lon.ndim() == 1 && lat.ndim() == 1 {
            yx_dims = Some(("lat", "lon"));
            issues.extend(check_monotonic(dataset, "lon", Monotonic::Increasing));
            issues.extend(check_monotonic(dataset, "lat", Monotonic::IncreasingOrDecreasing));
        } else if lon.ndim() == 2 && lat.ndim() == 2 {
            for variable in [lon, lat] {
                if !variable.dims_are(&["y", "x"]) {
                    issues.push(Issue::error(format!(
                        "dimensions of '{}' must be ('y', 'x')",
                        variable.name
                    )));
                }
            }
            yx_dims = Some(("y", "x"));
        } else {
            issues.push(Issue::error(
                "coordinate variables 'lon' and 'lat' must both be either 1-D or 2-D",
            ));
        }
    }

    let Some((y_dim, x_dim)) = yx_dims else {
        issues.push(Issue::error("no valid spatial coordinates found"));
        return issues;
    };

    for variable in dataset.variables.values() {
        if variable.has_dim(y_dim) && variable.has_dim(x_dim) {
            let last_two = &variable.dims[variable.ndim().saturating_sub(2)..];
            if last_two != [y_dim, x_dim] {
                issues.push(Issue::error(format!(
                    "last two dimensions of variable '{}' must be ('{y_dim}', '{x_dim}'), \
                     but dimensions are {}",
                    variable.name,
                    format_dims(&variable.dims)
                )));
            }
        }
    }

    issues
}

fn check_crs(dataset: &Dataset) -> Vec<Issue> {
    let mut issues = check_variable(dataset, CRS_VAR_NAME);
    if let Some(crs) = dataset.get(CRS_VAR_NAME) {
        if let Err(err) = Crs::from_cf(&crs.attrs) {
            issues.push(Issue::error(format!(
                "invalid '{CRS_VAR_NAME}' variable: {err}"
            )));
        }
    }
    issues
}

/// Presence plus the attributes expected of a quantity variable.
fn check_variable(dataset: &Dataset, name: &str) -> Vec<Issue> {
    let Some(variable) = dataset.get(name) else {
        return vec![Issue::error(format!("missing variable '{name}'"))];
    };
    if !is_quantity(variable) {
        return Vec::new();
    }
    QUANTITY_ATTRS
        .iter()
        .filter(|attr| !variable.has_attr(attr))
        .map(|attr| missing_attr(name, attr))
        .collect()
}

fn check_monotonic(dataset: &Dataset, name: &str, order: Monotonic) -> Vec<Issue> {
    let Some(variable) = dataset.get(name) else {
        return Vec::new();
    };
    if !variable.is_dimension_coord() {
        return vec![Issue::error(format!(
            "variable '{name}' must have a single dimension '{name}'"
        ))];
    }

    let values = match &variable.values {
        Some(Values::Unavailable(reason)) => {
            return vec![Issue::error(format!(
                "cannot check values of variable '{name}': {reason}"
            ))];
        }
        Some(values) => values,
        None => {
            return vec![Issue::error(format!(
                "cannot check values of variable '{name}': values not loaded"
            ))];
        }
    };

    let increasing = values.is_strictly_increasing();
    match order {
        Monotonic::Increasing if !increasing => vec![Issue::error(format!(
            "values of variable '{name}' must be strictly monotonically increasing"
        ))],
        Monotonic::IncreasingOrDecreasing if !increasing && !values.is_strictly_decreasing() => {
            vec![Issue::error(format!(
                "values of variable '{name}' must be strictly monotonically \
                 increasing or decreasing"
            ))]
        }
        _ => Vec::new(),
    }
}

/// Flag variables are marked by `flag_names`.
fn is_quantity(variable: &Variable) -> bool {
    variable.name != CRS_VAR_NAME && variable.ndim() > 0 && !variable.has_attr("flag_names")
}

fn missing_attr(variable: &str, attr: &str) -> Issue {
    Issue::warning(format!("missing attribute '{attr}' in variable '{variable}'"))
}

/// Render dimension names as a tuple, e.g. `('time', 'y', 'x')`.
pub fn format_dims(dims: &[String]) -> String {
    let quoted: Vec<String> = dims.iter().map(|dim| format!("'{dim}'")).collect();
    match quoted.as_slice() {
        [single] => format!("({single},)"),
        _ => format!("({})", quoted.join(", ")),
    }
}
