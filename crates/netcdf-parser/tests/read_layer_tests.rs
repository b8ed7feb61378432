//! Round trips through small NetCDF files written to a temp directory.

use std::path::{Path, PathBuf};

use netcdf_parser::{read_grid, read_layer, LayerRequest, NetCdfError};
use zonal_common::{CoordinateRegistration, ZonalError};

/// Write a 3x4 south-up file: lat ascending 0.5..2.5, lon 10.5..13.5.
fn write_south_up(dir: &Path) -> PathBuf {
    let path = dir.join("pm25_2021.nc");
    let mut file = netcdf::create(&path).expect("create file");
    file.add_dimension("lat", 3).expect("lat dim");
    file.add_dimension("lon", 4).expect("lon dim");

    let mut lat = file.add_variable::<f64>("lat", &["lat"]).expect("lat var");
    lat.put_values(&[0.5, 1.5, 2.5], ..).expect("lat values");
    let mut lon = file.add_variable::<f64>("lon", &["lon"]).expect("lon var");
    lon.put_values(&[10.5, 11.5, 12.5, 13.5], ..).expect("lon values");

    let mut pm = file
        .add_variable::<f32>("PM25", &["lat", "lon"])
        .expect("data var");
    pm.put_attribute("missing_value", -999.0f32)
        .expect("missing_value");
    // Southernmost row first.
    let values: [f32; 12] = [
        1.0, 2.0, 3.0, 4.0, //
        5.0, -999.0, 7.0, 8.0, //
        9.0, 10.0, 11.0, 12.0,
    ];
    pm.put_values(&values, ..).expect("data values");
    path
}

fn write_three_dimensional(dir: &Path) -> PathBuf {
    let path = dir.join("so4_2021.nc");
    let mut file = netcdf::create(&path).expect("create file");
    file.add_dimension("time", 1).expect("time dim");
    file.add_dimension("lat", 2).expect("lat dim");
    file.add_dimension("lon", 2).expect("lon dim");
    let mut lat = file.add_variable::<f64>("lat", &["lat"]).expect("lat var");
    lat.put_values(&[0.5, 1.5], ..).expect("lat values");
    let mut lon = file.add_variable::<f64>("lon", &["lon"]).expect("lon var");
    lon.put_values(&[0.5, 1.5], ..).expect("lon values");
    let mut so4 = file
        .add_variable::<f32>("SO4", &["time", "lat", "lon"])
        .expect("data var");
    so4.put_values(&[1.0f32, 2.0, 3.0, 4.0], ..)
        .expect("data values");
    path
}

#[test]
fn test_read_south_up_layer() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_south_up(dir.path());

    let layer = read_layer(&path, &LayerRequest::new("PM25")).unwrap();

    assert_eq!(layer.grid.rows, 3);
    assert_eq!(layer.grid.cols, 4);
    assert!((layer.grid.origin_x - 10.0).abs() < 1e-9);
    assert!((layer.grid.origin_y - 3.0).abs() < 1e-9);

    // Flipped to north-up.
    assert_eq!(layer.get(0, 0), Some(9.0));
    assert_eq!(layer.get(2, 3), Some(4.0));
    assert!(layer.is_invalid_at(1, 1));
    assert_eq!(layer.valid_count(), 11);
    assert!(layer.provenance.ends_with("pm25_2021.nc"));
}

#[test]
fn test_corner_registration_shifts_origin() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_south_up(dir.path());

    let request =
        LayerRequest::new("PM25").with_registration(CoordinateRegistration::CellCorner);
    let grid = read_grid(&path, &request).unwrap();
    assert!((grid.origin_x - 10.5).abs() < 1e-9);
    assert!((grid.origin_y - 2.5).abs() < 1e-9);
}

#[test]
fn test_sentinel_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_south_up(dir.path());

    let request = LayerRequest::new("PM25").with_nodata(Some(12.0));
    let layer = read_layer(&path, &request).unwrap();
    // 12.0 is now the sentinel; the missing_value cell stays NaN and invalid.
    assert!(layer.is_invalid_at(0, 3));
    assert!(layer.is_invalid_at(1, 1));
    assert_eq!(layer.valid_count(), 10);
}

#[test]
fn test_three_dimensional_variable_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_three_dimensional(dir.path());

    let err = read_layer(&path, &LayerRequest::new("SO4")).unwrap_err();
    match &err {
        NetCdfError::NotTwoDimensional { variable, dims } => {
            assert_eq!(variable, "SO4");
            assert_eq!(dims.len(), 3);
        }
        other => panic!("expected dimensionality error, got {other}"),
    }
    assert!(ZonalError::from(err).is_configuration());
}

#[test]
fn test_missing_variable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_south_up(dir.path());

    let err = read_layer(&path, &LayerRequest::new("DUST")).unwrap_err();
    assert!(matches!(err, NetCdfError::MissingData(_)));
}

#[test]
fn test_unreadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not_netcdf.nc");
    std::fs::write(&path, b"plain text").unwrap();

    let err = read_layer(&path, &LayerRequest::new("PM25")).unwrap_err();
    assert!(matches!(err, NetCdfError::ReadError(_)));
}
