use avl_core::{Attrs, Crs, DataType, Dataset, Values, Variable};
use avl_verify::rules::EXPECTED_GLOBAL_ATTRS;
use avl_verify::{Issue, IssueSeverity, filter_issues, verify_dataset};
use serde_json::json;

fn global_attrs() -> Attrs {
    EXPECTED_GLOBAL_ATTRS
        .iter()
        .map(|name| (name.to_string(), json!("set")))
        .collect()
}

fn coord(name: &str, values: Vec<f64>) -> Variable {
    Variable::new(name, DataType::Float64, &[name], vec![values.len() as u64])
        .with_attr("standard_name", name)
        .with_attr("units", "1")
        .with_values(values)
}

fn geographic() -> Dataset {
    let mut dataset = Dataset::new().with_attrs(global_attrs());
    dataset.insert(coord("time", vec![10.0, 20.0]));
    dataset.insert(coord("lon", vec![0.5, 1.5, 2.5]));
    dataset.insert(coord("lat", vec![1.5, 0.5]));
    dataset.insert(
        Variable::new("var_a", DataType::Float32, &["time", "lat", "lon"], vec![2, 2, 3])
            .with_attr("long_name", "A")
            .with_attr("units", "mg/kg"),
    );
    dataset
}

fn projected() -> Dataset {
    let mut dataset = Dataset::new().with_attrs(global_attrs());
    dataset.insert(coord("time", vec![0.0]));
    dataset.insert(coord("x", vec![500_000.0, 500_010.0]));
    dataset.insert(coord("y", vec![5_000_010.0, 5_000_000.0]));
    let crs = Crs::utm(33, true).unwrap();
    dataset.insert(Variable::scalar("crs", DataType::Int32, 0.0).with_attrs(crs.to_cf()));
    dataset.insert(
        Variable::new("var_a", DataType::Float32, &["time", "y", "x"], vec![1, 2, 2])
            .with_attr("long_name", "A")
            .with_attr("units", "1")
            .with_attr("grid_mapping", "crs"),
    );
    dataset
}

fn messages(issues: &[Issue]) -> Vec<&str> {
    issues.iter().map(|issue| issue.message.as_str()).collect()
}

#[test]
fn conforming_datasets_have_no_issues() {
    assert_eq!(verify_dataset(&geographic()), Vec::new());
    assert_eq!(verify_dataset(&projected()), Vec::new());
}

#[test]
fn empty_dataset_reports_every_rule_in_order() {
    let issues = verify_dataset(&Dataset::new());
    assert_eq!(issues.len(), EXPECTED_GLOBAL_ATTRS.len() + 2);
    assert_eq!(issues[0], Issue::warning("missing global attribute 'Conventions'"));
    assert_eq!(
        issues[EXPECTED_GLOBAL_ATTRS.len()],
        Issue::error("missing variable 'time'")
    );
    assert_eq!(
        issues.last().unwrap(),
        &Issue::error("no valid spatial coordinates found")
    );
}

#[test]
fn level_filter_keeps_errors_only() {
    let issues = verify_dataset(&Dataset::new());
    let errors = filter_issues(issues.clone(), IssueSeverity::Error);
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|issue| issue.severity == IssueSeverity::Error));
    assert_eq!(filter_issues(issues.clone(), IssueSeverity::Warning), issues);
}

#[test]
fn time_must_increase_and_lead_dimensions() {
    let mut dataset = geographic();
    dataset.insert(coord("time", vec![20.0, 10.0]));
    dataset.insert(
        Variable::new("var_b", DataType::Float32, &["lat", "time"], vec![2, 2])
            .with_attr("long_name", "B")
            .with_attr("units", "1"),
    );
    let issues = verify_dataset(&dataset);
    assert_eq!(
        messages(&issues),
        vec![
            "values of variable 'time' must be strictly monotonically increasing",
            "first dimension of variable 'var_b' must be 'time', \
             but dimensions are ('lat', 'time')",
        ]
    );
}

#[test]
fn quantity_coordinates_need_standard_name_and_units() {
    let mut dataset = geographic();
    dataset.insert(
        Variable::new("time", DataType::Int64, &["time"], vec![2]).with_values(vec![1.0, 2.0]),
    );
    let issues = verify_dataset(&dataset);
    assert_eq!(
        messages(&issues),
        vec![
            "missing attribute 'standard_name' in variable 'time'",
            "missing attribute 'units' in variable 'time'",
        ]
    );
    assert!(issues.iter().all(|issue| issue.severity == IssueSeverity::Warning));
}

#[test]
fn latitude_may_decrease_but_not_repeat() {
    let mut dataset = geographic();
    dataset.insert(coord("lat", vec![0.5, 0.5]));
    assert_eq!(
        messages(&verify_dataset(&dataset)),
        vec!["values of variable 'lat' must be strictly monotonically increasing or decreasing"]
    );
}

#[test]
fn spatial_dims_must_be_last() {
    let mut dataset = geographic();
    dataset.insert(
        Variable::new("var_a", DataType::Float32, &["time", "lon", "lat"], vec![2, 3, 2])
            .with_attr("long_name", "A")
            .with_attr("units", "1"),
    );
    assert_eq!(
        messages(&verify_dataset(&dataset)),
        vec![
            "last two dimensions of variable 'var_a' must be ('lat', 'lon'), \
             but dimensions are ('time', 'lon', 'lat')"
        ]
    );
}

#[test]
fn two_dimensional_lon_lat_must_use_y_x() {
    let mut dataset = Dataset::new().with_attrs(global_attrs());
    dataset.insert(coord("time", vec![0.0]));
    dataset.insert(
        Variable::new("lon", DataType::Float64, &["y", "x"], vec![2, 2])
            .with_attr("standard_name", "longitude")
            .with_attr("units", "degrees_east"),
    );
    dataset.insert(
        Variable::new("lat", DataType::Float64, &["x", "y"], vec![2, 2])
            .with_attr("standard_name", "latitude")
            .with_attr("units", "degrees_north"),
    );
    let issues = verify_dataset(&dataset);
    assert_eq!(
        filter_issues(issues, IssueSeverity::Error),
        vec![
            Issue::error("dimensions of 'lat' must be ('y', 'x')"),
            Issue::error(
                "last two dimensions of variable 'lat' must be ('y', 'x'), \
                 but dimensions are ('x', 'y')"
            ),
        ]
    );
}

#[test]
fn mixed_rank_lon_lat_is_rejected() {
    let mut dataset = geographic();
    dataset.insert(
        Variable::new("lat", DataType::Float64, &["lat", "lon"], vec![2, 3])
            .with_attr("standard_name", "latitude")
            .with_attr("units", "degrees_north"),
    );
    let errors = filter_issues(verify_dataset(&dataset), IssueSeverity::Error);
    assert_eq!(
        errors[0],
        Issue::error("coordinate variables 'lon' and 'lat' must both be either 1-D or 2-D")
    );
    assert!(
        errors
            .iter()
            .any(|issue| issue.message == "no valid spatial coordinates found")
    );
}

#[test]
fn projected_grid_requires_valid_crs() {
    let mut dataset = projected();
    dataset.insert(
        Variable::scalar("crs", DataType::Int32, 0.0)
            .with_attr("grid_mapping_name", "transverse_mercator"),
    );
    let issues = verify_dataset(&dataset);
    assert_eq!(issues.len(), 1);
    assert!(
        issues[0]
            .message
            .starts_with("invalid 'crs' variable: missing attribute")
    );

    let mut dataset = projected();
    dataset.variables.remove("crs");
    let messages: Vec<String> = verify_dataset(&dataset)
        .into_iter()
        .map(|issue| issue.message)
        .collect();
    assert_eq!(messages, vec!["missing variable 'crs'".to_string()]);
}

const LAEA_EUROPE_WKT: &str = "PROJCRS[\"ETRS89-extended / LAEA Europe\",\
    BASEGEOGCRS[\"ETRS89\",DATUM[\"European Terrestrial Reference System 1989\",\
    ELLIPSOID[\"GRS 1980\",6378137,298.257222101,LENGTHUNIT[\"metre\",1]]],\
    PRIMEM[\"Greenwich\",0,ANGLEUNIT[\"degree\",0.0174532925199433]]],\
    CONVERSION[\"Europe Equal Area 2001\",METHOD[\"Lambert Azimuthal Equal Area\"],\
    PARAMETER[\"Latitude of natural origin\",52,ANGLEUNIT[\"degree\",0.0174532925199433]],\
    PARAMETER[\"Longitude of natural origin\",10,ANGLEUNIT[\"degree\",0.0174532925199433]],\
    PARAMETER[\"False easting\",4321000,LENGTHUNIT[\"metre\",1]],\
    PARAMETER[\"False northing\",3210000,LENGTHUNIT[\"metre\",1]]],\
    CS[Cartesian,2],AXIS[\"northing (Y)\",north,ORDER[1],LENGTHUNIT[\"metre\",1]],\
    AXIS[\"easting (X)\",east,ORDER[2],LENGTHUNIT[\"metre\",1]],ID[\"EPSG\",3035]]";

#[test]
fn crs_given_as_wkt_is_accepted() {
    let mut dataset = projected();
    dataset.insert(
        Variable::scalar("crs", DataType::Int32, 0.0).with_attr("crs_wkt", LAEA_EUROPE_WKT),
    );
    assert_eq!(verify_dataset(&dataset), Vec::new());

    dataset.insert(
        Variable::scalar("crs", DataType::Int32, 0.0).with_attr("crs_wkt", "PROJCRS[\"broken\""),
    );
    let issues = verify_dataset(&dataset);
    assert_eq!(issues.len(), 1);
    assert!(
        issues[0]
            .message
            .starts_with("invalid 'crs' variable: invalid CRS definition")
    );
}

#[test]
fn undecodable_coordinates_are_errors() {
    let mut dataset = geographic();
    let mut lon = coord("lon", Vec::new());
    lon.shape = vec![3];
    lon.values = Some(Values::Unavailable("unsupported codec 'lzma'".to_string()));
    dataset.insert(lon);
    assert_eq!(
        filter_issues(verify_dataset(&dataset), IssueSeverity::Error),
        vec![Issue::error(
            "cannot check values of variable 'lon': unsupported codec 'lzma'"
        )]
    );
}

#[test]
fn data_variables_are_not_checked_for_attributes() {
    let mut dataset = geographic();
    dataset.insert(Variable::new(
        "var_a",
        DataType::Float32,
        &["time", "lat", "lon"],
        vec![2, 2, 3],
    ));
    dataset.insert(
        Variable::new("var_b", DataType::UInt16, &["time", "lat", "lon"], vec![2, 2, 3])
            .with_attr("flag_values", "1, 2, 3")
            .with_attr("grid_mapping", "crs"),
    );
    assert_eq!(verify_dataset(&dataset), Vec::new());
}

#[test]
fn only_flag_names_exempts_coordinates_from_quantity_attributes() {
    let mut dataset = geographic();
    dataset.insert(
        Variable::new("time", DataType::Int64, &["time"], vec![2])
            .with_attr("flag_names", "a b")
            .with_values(vec![1.0, 2.0]),
    );
    assert_eq!(verify_dataset(&dataset), Vec::new());

    dataset.insert(
        Variable::new("time", DataType::Int64, &["time"], vec![2])
            .with_attr("flag_values", "1, 2")
            .with_attr("flag_meanings", "a b")
            .with_values(vec![1.0, 2.0]),
    );
    assert_eq!(
        messages(&verify_dataset(&dataset)),
        vec![
            "missing attribute 'standard_name' in variable 'time'",
            "missing attribute 'units' in variable 'time'",
        ]
    );
}

#[test]
fn exact_time_values_are_compared_as_integers() {
    let base = 1_700_000_000_000_000_000i64;
    let mut dataset = geographic();
    let mut time = coord("time", Vec::new());
    time.shape = vec![2];
    time.values = Some(Values::Exact(vec![Some(base + 1), Some(base)]));
    dataset.insert(time);
    assert_eq!(
        messages(&verify_dataset(&dataset)),
        vec!["values of variable 'time' must be strictly monotonically increasing"]
    );

    let mut time = coord("time", Vec::new());
    time.shape = vec![2];
    time.values = Some(Values::Exact(vec![Some(base), Some(base + 1)]));
    dataset.insert(time);
    assert_eq!(verify_dataset(&dataset), Vec::new());
}

#[tokio::test]
async fn verify_location_reads_written_dataset() {
    let dir = std::env::temp_dir().join(format!("avl_verify_{}", uuid::Uuid::new_v4()));
    let path = dir.join("geographic.zarr");
    avl_zarr::write_dataset(&geographic(), &path, &avl_zarr::WriteOptions::default()).unwrap();

    let location = avl_zarr::Location::Local(path);
    let issues = avl_verify::verify_location(
        &location,
        IssueSeverity::Warning,
        &avl_zarr::S3Options::default(),
    )
    .await
    .unwrap();
    assert_eq!(issues, Vec::new());

    let missing = avl_zarr::Location::Local(dir.join("missing.zarr"));
    let result =
        avl_verify::verify_location(&missing, IssueSeverity::Error, &avl_zarr::S3Options::default())
            .await;
    assert!(matches!(result, Err(avl_verify::VerifyError::Zarr(_))));

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn blosc_compressed_coordinates_are_checked_at_error_level() {
    let dir = std::env::temp_dir().join(format!("avl_verify_{}", uuid::Uuid::new_v4()));
    let path = dir.join("decreasing_x.zarr.zip");
    let mut dataset = projected();
    dataset.insert(coord("x", vec![500_010.0, 500_000.0]));
    let options = avl_zarr::WriteOptions {
        compressor: Some(avl_zarr::Compressor::Blosc {
            cname: "lz4".to_string(),
            clevel: 5,
            shuffle: 1,
            blocksize: 0,
        }),
        ..avl_zarr::WriteOptions::default()
    };
    avl_zarr::write_dataset(&dataset, &path, &options).unwrap();

    let issues = avl_verify::verify_location(
        &avl_zarr::Location::Local(path),
        IssueSeverity::Error,
        &avl_zarr::S3Options::default(),
    )
    .await
    .unwrap();
    assert_eq!(
        issues,
        vec![Issue::error(
            "values of variable 'x' must be strictly monotonically increasing"
        )]
    );

    std::fs::remove_dir_all(dir).ok();
}
