use chrono::{DateTime, TimeDelta, Utc};
use geo_types::{Coord, Rect};
use serde_json::Value;
use tracing::debug;

use avl_core::{Attrs, CRS_VAR_NAME, Crs, DataType, Dataset, Variable};

use crate::errors::{Result, SampleError};
use crate::geospatial::{geospatial_attrs, time_coverage_attrs};
use crate::model::SampleOptions;
use crate::time::{TimeResolution, parse_time};

const BNDS_DIM: &str = "bnds";

/// Global attributes set on every sample unless overridden.
pub fn default_metadata() -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("Conventions".into(), "CF-1.7".into());
    attrs.insert("title".into(), "AVL test dataset".into());
    attrs.insert(
        "summary".into(),
        "This dataset is used to demonstrate the AVL common dataset convention".into(),
    );
    attrs.insert("keywords".into(), "ESA, AVL, Agriculture, EO".into());
    attrs.insert("sources".into(), "synthetic data".into());
    attrs.insert(
        "history".into(),
        format!(
            "{} created by avl-sample {}",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            env!("CARGO_PKG_VERSION")
        )
        .into(),
    );
    attrs.insert("id".into(), "avl-sample".into());
    attrs
}

/// Build a conforming sample dataset.
///
/// Coordinates, bounds and the `crs` variable carry values; data variables
/// are metadata only and read back as their fill value once written.
pub fn new_dataset(options: &SampleOptions) -> Result<Dataset> {
    validate(options)?;

    let (width, height) = options.xy_size;
    let (x_name, y_name) = (options.xy_names.0.as_str(), options.xy_names.1.as_str());
    let (x_units, y_units) = (options.xy_units.0.as_str(), options.xy_units.1.as_str());
    let (x_res, y_res) = options.xy_res;
    let (x_start, y_start) = options.xy_start;
    let x_end = x_start + width as f64 * x_res;
    let y_end = y_start + height as f64 * y_res;
    let time_name = options.time_name.as_str();

    let mut x_values = cell_centres(x_start, x_res, width);
    let mut y_values = cell_centres(y_start, y_res, height);
    let mut x_bounds = cell_bounds(x_start, x_res, width);
    let mut y_bounds = cell_bounds(y_start, y_res, height);
    if options.inverse_y {
        y_values.reverse();
        y_bounds.reverse();
    }
    if options.xy_dtype == DataType::Float32 {
        for value in x_values.iter_mut().chain(y_values.iter_mut()) {
            *value = *value as f32 as f64;
        }
        for value in x_bounds.iter_mut().chain(y_bounds.iter_mut()) {
            *value = *value as f32 as f64;
        }
    }

    let x_is_lon = x_name == "lon" || x_units == "degrees_east";
    let y_is_lat = y_name == "lat" || y_units == "degrees_north";

    let mut x_var = Variable::new(x_name, options.xy_dtype, &[x_name], vec![width])
        .with_attr("units", x_units)
        .with_attrs(axis_attrs(x_is_lon, "longitude", "x"))
        .with_values(x_values);
    let mut y_var = Variable::new(y_name, options.xy_dtype, &[y_name], vec![height])
        .with_attr("units", y_units)
        .with_attrs(axis_attrs(y_is_lat, "latitude", "y"))
        .with_values(y_values);

    let step = options.time_res.parse::<TimeResolution>()?;
    let delta = step.duration()?;
    let first = parse_time(&options.time_start)?;
    let edges = time_edges(first, delta, options.time_periods)?;
    let time_values: Vec<f64> = edges
        .windows(2)
        .map(|pair| (pair[0] + (pair[1] - pair[0]) / 2).timestamp() as f64)
        .collect();
    let mut time_var = Variable::new(
        time_name,
        DataType::Int64,
        &[time_name],
        vec![options.time_periods],
    )
    .with_attr("standard_name", "time")
    .with_attr("long_name", "time")
    .with_attrs(time_encoding(options))
    .with_values(time_values);

    let mut dataset = Dataset::new();

    if !options.drop_bounds {
        let x_bnds = format!("{x_name}_bnds");
        let y_bnds = format!("{y_name}_bnds");
        let time_bnds = format!("{time_name}_bnds");

        dataset.insert(
            Variable::new(&x_bnds, DataType::Float64, &[x_name, BNDS_DIM], vec![width, 2])
                .with_attr("units", x_units)
                .with_values(x_bounds),
        );
        dataset.insert(
            Variable::new(&y_bnds, DataType::Float64, &[y_name, BNDS_DIM], vec![height, 2])
                .with_attr("units", y_units)
                .with_values(y_bounds),
        );
        let time_bounds = edges
            .windows(2)
            .flat_map(|pair| [pair[0].timestamp() as f64, pair[1].timestamp() as f64])
            .collect();
        dataset.insert(
            Variable::new(
                &time_bnds,
                DataType::Int64,
                &[time_name, BNDS_DIM],
                vec![options.time_periods, 2],
            )
            .with_attrs(time_encoding(options))
            .with_values(time_bounds),
        );

        x_var = x_var.with_attr("bounds", x_bnds);
        y_var = y_var.with_attr("bounds", y_bnds);
        time_var = time_var.with_attr("bounds", time_bnds);
    }
    dataset.insert(x_var);
    dataset.insert(y_var);
    dataset.insert(time_var);

    let mut attrs = default_metadata();
    attrs.extend(options.metadata.clone());
    let extent = Rect::new(
        Coord {
            x: x_start,
            y: y_start,
        },
        Coord { x: x_end, y: y_end },
    );
    let grid_crs = options.crs.clone().unwrap_or_else(Crs::crs84);
    attrs.extend(geospatial_attrs(extent, (x_res, y_res), &grid_crs)?);
    if let (Some(start), Some(end)) = (edges.first(), edges.last()) {
        attrs.extend(time_coverage_attrs(start, end, &step.to_iso8601()));
    }
    dataset.attrs = attrs;

    let shape = vec![options.time_periods, height, width];
    let (tile_x, tile_y) = options.xy_tile_size.unwrap_or((width, height));
    let chunks = vec![1, tile_y, tile_x];
    for spec in &options.variables {
        let mut variable = Variable::new(
            &spec.name,
            spec.dtype,
            &[time_name, y_name, x_name],
            shape.clone(),
        )
        .with_chunks(chunks.clone())
        .with_fill_value(0.0)
        .with_attrs(spec.attrs.clone());
        if options.crs.is_some() {
            variable = variable.with_attr("grid_mapping", CRS_VAR_NAME);
        }
        dataset.insert(variable);
    }

    if let Some(crs) = &options.crs {
        dataset.insert(
            Variable::scalar(CRS_VAR_NAME, DataType::Int32, 0.0).with_attrs(crs.to_cf()),
        );
    }

    dataset.validate()?;
    debug!(
        event = "sample_built",
        width,
        height,
        time_periods = options.time_periods,
        variables = dataset.variables.len()
    );
    Ok(dataset)
}

fn validate(options: &SampleOptions) -> Result<()> {
    let invalid = |reason: String| Err(SampleError::InvalidOptions(reason));
    let (x_res, y_res) = options.xy_res;
    if !(x_res > 0.0 && y_res > 0.0 && x_res.is_finite() && y_res.is_finite()) {
        return invalid(format!("resolution must be positive, got ({x_res}, {y_res})"));
    }
    if options.time_periods == 0 {
        return invalid("at least one time period is required".to_string());
    }
    if let Some((tile_x, tile_y)) = options.xy_tile_size {
        if tile_x == 0 || tile_y == 0 {
            return invalid(format!("tile size must be positive, got ({tile_x}, {tile_y})"));
        }
    }
    if !options.xy_dtype.is_float() {
        return invalid(format!(
            "coordinate data type must be float32 or float64, got {}",
            options.xy_dtype
        ));
    }
    let (x_name, y_name) = (&options.xy_names.0, &options.xy_names.1);
    let reserved = [x_name.as_str(), y_name.as_str(), options.time_name.as_str(), BNDS_DIM];
    if x_name == y_name || x_name == &options.time_name || y_name == &options.time_name {
        return invalid("coordinate names must be distinct".to_string());
    }
    for spec in &options.variables {
        if reserved.contains(&spec.name.as_str()) || spec.name == CRS_VAR_NAME {
            return invalid(format!("variable name '{}' is reserved", spec.name));
        }
        if !spec.dtype.is_numeric() {
            return invalid(format!("variable '{}' must be numeric", spec.name));
        }
    }
    Ok(())
}

fn cell_centres(start: f64, res: f64, count: u64) -> Vec<f64> {
    (0..count).map(|i| start + (i as f64 + 0.5) * res).collect()
}

/// `(count, 2)` bounds in C order; reversing the flat vector reverses rows and swaps pairs.
fn cell_bounds(start: f64, res: f64, count: u64) -> Vec<f64> {
    (0..count)
        .flat_map(|i| [start + i as f64 * res, start + (i + 1) as f64 * res])
        .collect()
}

fn axis_attrs(geographic: bool, geographic_name: &str, axis: &str) -> Attrs {
    let (long_name, standard_name) = if geographic {
        (geographic_name.to_string(), geographic_name.to_string())
    } else {
        (
            format!("{axis} coordinate of projection"),
            format!("projection_{axis}_coordinate"),
        )
    };
    let mut attrs = Attrs::new();
    attrs.insert("long_name".into(), Value::from(long_name));
    attrs.insert("standard_name".into(), Value::from(standard_name));
    attrs
}

fn time_encoding(options: &SampleOptions) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("units".into(), Value::from(options.time_units.as_str()));
    attrs.insert("calendar".into(), Value::from(options.time_calendar.as_str()));
    attrs
}

/// `periods + 1` step edges starting at `first`.
fn time_edges(
    first: DateTime<Utc>,
    delta: TimeDelta,
    periods: u64,
) -> Result<Vec<DateTime<Utc>>> {
    let mut edges = Vec::with_capacity(periods as usize + 1);
    let mut current = first;
    edges.push(current);
    for _ in 0..periods {
        current = current
            .checked_add_signed(delta)
            .ok_or_else(|| SampleError::Time("time range out of bounds".to_string()))?;
        edges.push(current);
    }
    Ok(edges)
}
