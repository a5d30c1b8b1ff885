use chrono::{DateTime, Utc};
use geo_types::{Coord, LineString, Polygon, Rect};
use serde_json::Value;

use avl_core::{Attrs, Crs};

use crate::errors::Result;
use crate::time::{format_time, iso8601_duration};

/// `geospatial_*` attributes for a grid extent given in `crs` coordinates.
///
/// Projected extents are transformed to CRS84 corner by corner; the
/// resolution is estimated one cell away from the grid centre.
pub fn geospatial_attrs(extent: Rect<f64>, res: (f64, f64), crs: &Crs) -> Result<Attrs> {
    let (bounds, lon_res, lat_res) = if crs.is_geographic() {
        (extent, res.0.abs(), res.1.abs())
    } else {
        let min = extent.min();
        let max = extent.max();
        let mut corners = Vec::with_capacity(4);
        for (x, y) in [(min.x, min.y), (min.x, max.y), (max.x, max.y), (max.x, min.y)] {
            let (lon, lat) = crs.to_crs84(x, y)?;
            corners.push(Coord { x: lon, y: lat });
        }
        let first = corners[0];
        let (lower, upper) = corners.iter().skip(1).fold((first, first), |(lo, hi), c| {
            (
                Coord {
                    x: lo.x.min(c.x),
                    y: lo.y.min(c.y),
                },
                Coord {
                    x: hi.x.max(c.x),
                    y: hi.y.max(c.y),
                },
            )
        });

        let centre = extent.center();
        let (lon1, lat1) = crs.to_crs84(centre.x, centre.y)?;
        let (lon2, lat2) = crs.to_crs84(centre.x + res.0, centre.y + res.1)?;
        (
            Rect::new(lower, upper),
            (lon2 - lon1).abs(),
            (lat2 - lat1).abs(),
        )
    };

    let mut attrs = Attrs::new();
    attrs.insert("geospatial_lon_units".into(), "degrees_east".into());
    attrs.insert("geospatial_lon_min".into(), bounds.min().x.into());
    attrs.insert("geospatial_lon_max".into(), bounds.max().x.into());
    attrs.insert("geospatial_lon_resolution".into(), lon_res.into());
    attrs.insert("geospatial_lat_units".into(), "degrees_north".into());
    attrs.insert("geospatial_lat_min".into(), bounds.min().y.into());
    attrs.insert("geospatial_lat_max".into(), bounds.max().y.into());
    attrs.insert("geospatial_lat_resolution".into(), lat_res.into());
    attrs.insert("geospatial_bounds_crs".into(), "CRS84".into());
    attrs.insert(
        "geospatial_bounds".into(),
        Value::from(polygon_wkt(&bounds_polygon(&bounds))),
    );
    Ok(attrs)
}

/// `time_coverage_*` attributes; resolution is already ISO 8601.
pub fn time_coverage_attrs(
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
    resolution: &str,
) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("time_coverage_start".into(), format_time(start).into());
    attrs.insert("time_coverage_end".into(), format_time(end).into());
    attrs.insert("time_coverage_resolution".into(), resolution.into());
    attrs.insert(
        "time_coverage_duration".into(),
        iso8601_duration(*end - *start).into(),
    );
    attrs
}

/// Closed ring starting at the lower-left corner, going north first.
pub fn bounds_polygon(rect: &Rect<f64>) -> Polygon<f64> {
    let (min, max) = (rect.min(), rect.max());
    let ring = LineString::from(vec![
        (min.x, min.y),
        (min.x, max.y),
        (max.x, max.y),
        (max.x, min.y),
        (min.x, min.y),
    ]);
    Polygon::new(ring, Vec::new())
}

/// WKT of a polygon's exterior ring, e.g. `POLYGON((0 0, 0 1, 1 1, 1 0, 0 0))`.
pub fn polygon_wkt(polygon: &Polygon<f64>) -> String {
    let ring: Vec<String> = polygon
        .exterior()
        .coords()
        .map(|coord| format!("{} {}", coord.x, coord.y))
        .collect();
    format!("POLYGON(({}))", ring.join(", "))
}
