//! Coordinate reference systems as described by CF grid-mapping attributes.
//!
//! A [`Crs`] keeps a PROJ definition next to its CF attributes. PROJ
//! validates every definition and performs all transformations, so any CRS
//! PROJ understands (WKT, PROJ strings, CF grid mappings) is accepted.

use std::fmt;

use proj::Proj;
use serde_json::Value;
use thiserror::Error;

use crate::dataset::Attrs;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_INV_F: f64 = 298.257_223_563;

const CRS84_DEFINITION: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// Errors raised while decoding or using a CRS.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrsError {
    #[error("missing attribute '{0}'")]
    MissingAttribute(String),
    #[error("attribute '{name}' {reason}")]
    InvalidAttribute { name: String, reason: String },
    #[error("unknown grid mapping '{0}'")]
    UnknownGridMapping(String),
    #[error("invalid UTM zone {0}")]
    InvalidZone(u8),
    #[error("invalid CRS definition '{definition}': {reason}")]
    Invalid { definition: String, reason: String },
    #[error("cannot transform from '{from}' to '{to}': {reason}")]
    Transform {
        from: String,
        to: String,
        reason: String,
    },
}

/// A CF grid mapping, the PROJ projection implementing it and the
/// attributes it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridMapping {
    pub name: &'static str,
    pub proj: &'static str,
    pub required: &'static [&'static str],
}

const FALSE_EASTING: &str = "false_easting";
const FALSE_NORTHING: &str = "false_northing";

/// Grid mappings defined by the CF conventions (appendix F).
pub const GRID_MAPPINGS: &[GridMapping] = &[
    GridMapping {
        name: "albers_conical_equal_area",
        proj: "aea",
        required: &[
            "standard_parallel",
            "longitude_of_central_meridian",
            "latitude_of_projection_origin",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "azimuthal_equidistant",
        proj: "aeqd",
        required: &[
            "longitude_of_projection_origin",
            "latitude_of_projection_origin",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "geostationary",
        proj: "geos",
        required: &[
            "latitude_of_projection_origin",
            "longitude_of_projection_origin",
            "perspective_point_height",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "lambert_azimuthal_equal_area",
        proj: "laea",
        required: &[
            "longitude_of_projection_origin",
            "latitude_of_projection_origin",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "lambert_conformal_conic",
        proj: "lcc",
        required: &[
            "standard_parallel",
            "longitude_of_central_meridian",
            "latitude_of_projection_origin",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "lambert_cylindrical_equal_area",
        proj: "cea",
        required: &["longitude_of_central_meridian", FALSE_EASTING, FALSE_NORTHING],
    },
    GridMapping {
        name: "latitude_longitude",
        proj: "longlat",
        required: &[],
    },
    GridMapping {
        name: "mercator",
        proj: "merc",
        required: &["longitude_of_projection_origin", FALSE_EASTING, FALSE_NORTHING],
    },
    GridMapping {
        name: "oblique_mercator",
        proj: "omerc",
        required: &[
            "azimuth_of_central_line",
            "latitude_of_projection_origin",
            "longitude_of_projection_origin",
            "scale_factor_at_projection_origin",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "orthographic",
        proj: "ortho",
        required: &[
            "longitude_of_projection_origin",
            "latitude_of_projection_origin",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "polar_stereographic",
        proj: "stere",
        required: &[
            "straight_vertical_longitude_from_pole",
            "latitude_of_projection_origin",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "rotated_latitude_longitude",
        proj: "ob_tran",
        required: &["grid_north_pole_latitude", "grid_north_pole_longitude"],
    },
    GridMapping {
        name: "sinusoidal",
        proj: "sinu",
        required: &["longitude_of_projection_origin", FALSE_EASTING, FALSE_NORTHING],
    },
    GridMapping {
        name: "stereographic",
        proj: "stere",
        required: &[
            "longitude_of_projection_origin",
            "latitude_of_projection_origin",
            "scale_factor_at_projection_origin",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "transverse_mercator",
        proj: "tmerc",
        required: &[
            "scale_factor_at_central_meridian",
            "longitude_of_central_meridian",
            "latitude_of_projection_origin",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
    GridMapping {
        name: "vertical_perspective",
        proj: "nsper",
        required: &[
            "latitude_of_projection_origin",
            "longitude_of_projection_origin",
            "perspective_point_height",
            FALSE_EASTING,
            FALSE_NORTHING,
        ],
    },
];

/// CF attributes that translate one-to-one into PROJ parameters.
const PROJ_PARAMS: &[(&str, &str)] = &[
    ("latitude_of_projection_origin", "lat_0"),
    ("longitude_of_projection_origin", "lon_0"),
    ("longitude_of_central_meridian", "lon_0"),
    ("straight_vertical_longitude_from_pole", "lon_0"),
    ("scale_factor_at_central_meridian", "k_0"),
    ("scale_factor_at_projection_origin", "k_0"),
    ("azimuth_of_central_line", "alpha"),
    ("perspective_point_height", "h"),
    (FALSE_EASTING, "x_0"),
    (FALSE_NORTHING, "y_0"),
    ("semi_major_axis", "a"),
    ("semi_minor_axis", "b"),
    ("inverse_flattening", "rf"),
    ("earth_radius", "R"),
];

/// Look up a CF grid mapping by name.
pub fn grid_mapping(name: &str) -> Option<&'static GridMapping> {
    GRID_MAPPINGS.iter().find(|mapping| mapping.name == name)
}

/// A validated coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    definition: String,
    name: String,
    geographic: bool,
    cf: Attrs,
}

impl Crs {
    /// WGS 84 longitude/latitude in degrees, longitude first.
    pub fn crs84() -> Self {
        let mut cf = Attrs::new();
        cf.insert("grid_mapping_name".into(), "latitude_longitude".into());
        cf.insert("geographic_crs_name".into(), "WGS 84".into());
        insert_wgs84(&mut cf);
        Self {
            definition: CRS84_DEFINITION.to_string(),
            name: "CRS84".to_string(),
            geographic: true,
            cf,
        }
    }

    /// Universal Transverse Mercator zone on WGS 84.
    pub fn utm(zone: u8, north: bool) -> Result<Self, CrsError> {
        if !(1..=60).contains(&zone) {
            return Err(CrsError::InvalidZone(zone));
        }
        let south = if north { "" } else { " +south" };
        let definition =
            format!("+proj=utm +zone={zone}{south} +datum=WGS84 +units=m +no_defs +type=crs");
        let name = format!("WGS 84 / UTM zone {zone}{}", if north { "N" } else { "S" });

        let mut cf = Attrs::new();
        cf.insert("grid_mapping_name".into(), "transverse_mercator".into());
        cf.insert("projected_crs_name".into(), name.clone().into());
        cf.insert("geographic_crs_name".into(), "WGS 84".into());
        insert_wgs84(&mut cf);
        cf.insert("latitude_of_projection_origin".into(), 0.0.into());
        cf.insert(
            "longitude_of_central_meridian".into(),
            (f64::from(zone) * 6.0 - 183.0).into(),
        );
        cf.insert("false_easting".into(), 500_000.0.into());
        cf.insert(
            "false_northing".into(),
            (if north { 0.0 } else { 10_000_000.0 }).into(),
        );
        cf.insert("scale_factor_at_central_meridian".into(), 0.9996.into());

        Self::new(definition, name, false, cf)
    }

    /// Decode CF grid-mapping attributes.
    ///
    /// A `crs_wkt` (or `spatial_ref`) attribute takes precedence; otherwise
    /// the PROJ definition is assembled from `grid_mapping_name` and its
    /// parameters.
    pub fn from_cf(attrs: &Attrs) -> Result<Self, CrsError> {
        if let Some(wkt) = ["crs_wkt", "spatial_ref"]
            .iter()
            .find_map(|name| attrs.get(*name).and_then(Value::as_str))
        {
            let name = wkt_name(wkt).unwrap_or("unnamed").to_string();
            return Self::new(wkt.to_string(), name, is_geographic_wkt(wkt), attrs.clone());
        }

        let name = attrs
            .get("grid_mapping_name")
            .ok_or_else(|| CrsError::MissingAttribute("grid_mapping_name".to_string()))?;
        let name = name.as_str().ok_or_else(|| CrsError::InvalidAttribute {
            name: "grid_mapping_name".to_string(),
            reason: "must be a string".to_string(),
        })?;
        let mapping =
            grid_mapping(name).ok_or_else(|| CrsError::UnknownGridMapping(name.to_string()))?;

        for attr in mapping.required {
            let value = attrs
                .get(*attr)
                .ok_or_else(|| CrsError::MissingAttribute(attr.to_string()))?;
            if numbers(value).is_none() {
                return Err(CrsError::InvalidAttribute {
                    name: attr.to_string(),
                    reason: "must be numeric".to_string(),
                });
            }
        }

        let display_name = ["projected_crs_name", "geographic_crs_name"]
            .iter()
            .find_map(|key| attrs.get(*key).and_then(Value::as_str))
            .unwrap_or(mapping.name)
            .to_string();
        let geographic = matches!(
            mapping.name,
            "latitude_longitude" | "rotated_latitude_longitude"
        );
        Self::new(proj_definition(mapping, attrs)?, display_name, geographic, attrs.clone())
    }

    fn new(
        definition: String,
        name: String,
        geographic: bool,
        cf: Attrs,
    ) -> Result<Self, CrsError> {
        Proj::new(&definition).map_err(|err| CrsError::Invalid {
            definition: abbreviate(&definition),
            reason: err.to_string(),
        })?;
        Ok(Self {
            definition,
            name,
            geographic,
            cf,
        })
    }

    /// The PROJ definition: a PROJ string or WKT.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// CF grid-mapping attributes for this CRS.
    pub fn to_cf(&self) -> Attrs {
        self.cf.clone()
    }

    pub fn is_geographic(&self) -> bool {
        self.geographic
    }

    /// Transform CRS84 longitude/latitude into this CRS.
    pub fn from_crs84(&self, lon: f64, lat: f64) -> Result<(f64, f64), CrsError> {
        if self.definition == CRS84_DEFINITION {
            return Ok((lon, lat));
        }
        transform(CRS84_DEFINITION, &self.definition, (lon, lat))
    }

    /// Transform coordinates of this CRS into CRS84 longitude/latitude.
    pub fn to_crs84(&self, x: f64, y: f64) -> Result<(f64, f64), CrsError> {
        if self.definition == CRS84_DEFINITION {
            return Ok((x, y));
        }
        transform(&self.definition, CRS84_DEFINITION, (x, y))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn transform(from: &str, to: &str, point: (f64, f64)) -> Result<(f64, f64), CrsError> {
    let error = |reason: String| CrsError::Transform {
        from: abbreviate(from),
        to: abbreviate(to),
        reason,
    };
    let proj = Proj::new_known_crs(from, to, None).map_err(|err| error(err.to_string()))?;
    proj.convert(point).map_err(|err| error(err.to_string()))
}

/// Assemble a PROJ string from CF grid-mapping attributes.
fn proj_definition(mapping: &GridMapping, attrs: &Attrs) -> Result<String, CrsError> {
    let mut params = vec![format!("+proj={}", mapping.proj)];

    match mapping.name {
        "oblique_mercator" => {
            params.push(format!("+lonc={}", number(attrs, "longitude_of_projection_origin")?));
        }
        "rotated_latitude_longitude" => {
            params.push("+o_proj=longlat".to_string());
            params.push(format!("+o_lat_p={}", number(attrs, "grid_north_pole_latitude")?));
            params.push(format!(
                "+lon_0={}",
                180.0 + number(attrs, "grid_north_pole_longitude")?
            ));
            if let Some(value) = attrs.get("north_pole_grid_longitude").and_then(Value::as_f64) {
                params.push(format!("+o_lon_p={value}"));
            }
        }
        "geostationary" => {
            if let Some(axis) = attrs.get("sweep_angle_axis").and_then(Value::as_str) {
                params.push(format!("+sweep={axis}"));
            }
        }
        _ => {}
    }

    if let Some(value) = attrs.get("standard_parallel") {
        let parallels = numbers(value).ok_or_else(|| CrsError::InvalidAttribute {
            name: "standard_parallel".to_string(),
            reason: "must be numeric".to_string(),
        })?;
        match mapping.name {
            "mercator" | "polar_stereographic" | "lambert_cylindrical_equal_area" => {
                if let Some(first) = parallels.first() {
                    params.push(format!("+lat_ts={first}"));
                }
            }
            _ => {
                for (index, parallel) in parallels.iter().take(2).enumerate() {
                    params.push(format!("+lat_{}={parallel}", index + 1));
                }
            }
        }
    }

    for (attr, param) in PROJ_PARAMS {
        if mapping.name == "oblique_mercator" && *attr == "longitude_of_projection_origin" {
            continue;
        }
        if let Some(value) = attrs.get(*attr).and_then(Value::as_f64) {
            let entry = format!("+{param}=");
            if !params.iter().any(|existing| existing.starts_with(&entry)) {
                params.push(format!("{entry}{value}"));
            }
        }
    }

    let has_shape = ["semi_major_axis", "earth_radius"]
        .iter()
        .any(|attr| attrs.contains_key(*attr));
    if !has_shape {
        params.push("+ellps=WGS84".to_string());
    }
    params.push("+no_defs".to_string());
    params.push("+type=crs".to_string());
    Ok(params.join(" "))
}

fn insert_wgs84(attrs: &mut Attrs) {
    attrs.insert("reference_ellipsoid_name".into(), "WGS 84".into());
    attrs.insert(
        "horizontal_datum_name".into(),
        "World Geodetic System 1984".into(),
    );
    attrs.insert("prime_meridian_name".into(), "Greenwich".into());
    attrs.insert("semi_major_axis".into(), WGS84_A.into());
    attrs.insert("inverse_flattening".into(), WGS84_INV_F.into());
    attrs.insert("longitude_of_prime_meridian".into(), 0.0.into());
}

/// A number or a non-empty array of numbers.
fn numbers(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Number(number) => number.as_f64().map(|value| vec![value]),
        Value::Array(items) if !items.is_empty() => items.iter().map(Value::as_f64).collect(),
        _ => None,
    }
}

fn number(attrs: &Attrs, name: &str) -> Result<f64, CrsError> {
    attrs
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| CrsError::InvalidAttribute {
            name: name.to_string(),
            reason: "must be a single number".to_string(),
        })
}

fn is_geographic_wkt(wkt: &str) -> bool {
    let keyword: String = wkt
        .trim_start()
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect::<String>()
        .to_ascii_uppercase();
    matches!(
        keyword.as_str(),
        "GEOGCS" | "GEOGCRS" | "GEOGRAPHICCRS" | "GEODCRS" | "GEODETICCRS"
    )
}

/// The quoted name following the outermost WKT keyword.
fn wkt_name(wkt: &str) -> Option<&str> {
    let start = wkt.find('"')? + 1;
    let len = wkt[start..].find('"')?;
    Some(&wkt[start..start + len])
}

fn abbreviate(text: &str) -> String {
    const MAX: usize = 60;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAEA_EUROPE_WKT: &str = r#"PROJCRS["ETRS89-extended / LAEA Europe",
    BASEGEOGCRS["ETRS89",
        DATUM["European Terrestrial Reference System 1989",
            ELLIPSOID["GRS 1980",6378137,298.257222101,LENGTHUNIT["metre",1]]],
        PRIMEM["Greenwich",0,ANGLEUNIT["degree",0.0174532925199433]]],
    CONVERSION["Europe Equal Area 2001",
        METHOD["Lambert Azimuthal Equal Area",ID["EPSG",9820]],
        PARAMETER["Latitude of natural origin",52,ANGLEUNIT["degree",0.0174532925199433]],
        PARAMETER["Longitude of natural origin",10,ANGLEUNIT["degree",0.0174532925199433]],
        PARAMETER["False easting",4321000,LENGTHUNIT["metre",1]],
        PARAMETER["False northing",3210000,LENGTHUNIT["metre",1]]],
    CS[Cartesian,2],
        AXIS["northing (Y)",north,ORDER[1],LENGTHUNIT["metre",1]],
        AXIS["easting (X)",east,ORDER[2],LENGTHUNIT["metre",1]],
    ID["EPSG",3035]]"#;

    #[test]
    fn central_meridian_on_equator_maps_to_false_origin() {
        let crs = Crs::utm(33, true).unwrap();
        let (x, y) = crs.from_crs84(15.0, 0.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn forward_inverse_round_trip() {
        let crs = Crs::utm(33, true).unwrap();
        for (lon, lat) in [(10.0, 52.0), (15.3, -12.5), (18.9, 71.0)] {
            let (x, y) = crs.from_crs84(lon, lat).unwrap();
            let (lon2, lat2) = crs.to_crs84(x, y).unwrap();
            assert!((lon - lon2).abs() < 1e-7, "{lon} vs {lon2}");
            assert!((lat - lat2).abs() < 1e-7, "{lat} vs {lat2}");
        }
    }

    #[test]
    fn utm_rejects_invalid_zone() {
        assert_eq!(Crs::utm(61, true).unwrap_err(), CrsError::InvalidZone(61));
    }

    #[test]
    fn cf_attributes_describe_the_same_projection() {
        let utm = Crs::utm(33, true).unwrap();
        let decoded = Crs::from_cf(&utm.to_cf()).unwrap();
        assert_eq!(decoded.name(), "WGS 84 / UTM zone 33N");
        assert!(!decoded.is_geographic());

        let expected = utm.from_crs84(12.0, 48.0).unwrap();
        let actual = decoded.from_crs84(12.0, 48.0).unwrap();
        assert!((expected.0 - actual.0).abs() < 1e-3);
        assert!((expected.1 - actual.1).abs() < 1e-3);

        let geographic = Crs::from_cf(&Crs::crs84().to_cf()).unwrap();
        assert!(geographic.is_geographic());
    }

    #[test]
    fn cf_requires_mapping_parameters() {
        let mut attrs = Crs::utm(33, true).unwrap().to_cf();
        attrs.remove("false_easting");
        assert_eq!(
            Crs::from_cf(&attrs).unwrap_err(),
            CrsError::MissingAttribute("false_easting".to_string())
        );
    }

    #[test]
    fn cf_rejects_unknown_mapping() {
        let mut attrs = Attrs::new();
        attrs.insert("grid_mapping_name".into(), "flat_earth".into());
        assert!(matches!(
            Crs::from_cf(&attrs),
            Err(CrsError::UnknownGridMapping(_))
        ));
    }

    #[test]
    fn polar_stereographic_mapping_is_transformable() {
        let mut attrs = Attrs::new();
        attrs.insert("grid_mapping_name".into(), "polar_stereographic".into());
        attrs.insert("straight_vertical_longitude_from_pole".into(), 0.0.into());
        attrs.insert("latitude_of_projection_origin".into(), 90.0.into());
        attrs.insert("standard_parallel".into(), 70.0.into());
        attrs.insert("false_easting".into(), 0.0.into());
        attrs.insert("false_northing".into(), 0.0.into());
        let crs = Crs::from_cf(&attrs).unwrap();
        assert!(crs.definition().contains("+lat_ts=70"));

        let (lon, lat) = crs.to_crs84(0.0, 0.0).unwrap();
        assert!((lat - 90.0).abs() < 1e-9, "{lon} {lat}");
    }

    #[test]
    fn wkt_is_accepted_for_any_projection() {
        let mut attrs = Attrs::new();
        attrs.insert("crs_wkt".into(), LAEA_EUROPE_WKT.into());
        let crs = Crs::from_cf(&attrs).unwrap();
        assert_eq!(crs.name(), "ETRS89-extended / LAEA Europe");
        assert!(!crs.is_geographic());

        let (x, y) = crs.from_crs84(10.0, 52.0).unwrap();
        assert!((x - 4_321_000.0).abs() < 1e-3, "{x}");
        assert!((y - 3_210_000.0).abs() < 1e-3, "{y}");
    }

    #[test]
    fn malformed_wkt_is_rejected() {
        let mut attrs = Attrs::new();
        attrs.insert("crs_wkt".into(), "PROJCRS[\"broken\"".into());
        assert!(matches!(
            Crs::from_cf(&attrs),
            Err(CrsError::Invalid { .. })
        ));
    }

    #[test]
    fn geographic_wkt_is_detected() {
        assert!(is_geographic_wkt("GEOGCRS[\"WGS 84\",DATUM[...]]"));
        assert!(is_geographic_wkt(" GEOGCS[\"WGS 84\"]"));
        assert!(!is_geographic_wkt(LAEA_EUROPE_WKT));
    }
}
