//! End-to-end runs over NetCDF and shapefile inputs in a temp directory.

use std::collections::BTreeMap;
use std::path::Path;

use aggregator::output::read_long_table;
use aggregator::{aggregate, merge, parse_config, AggregateRequest, AggregatorConfig, MergeRequest};
use arrow::array::{Array, Float64Array, Int32Array, StringArray};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Writer};
use test_utils::{SCENARIO_MEAN_A, SCENARIO_MEAN_B, SCENARIO_VALUES};
use zonal_common::{Frequency, PeriodKey, ZoneId};

/// Scenario grid as cell-centre coordinates, stored north-up.
fn write_layer(path: &Path, variable: &str, scale: f32, offset: f32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("lat", 4).unwrap();
    file.add_dimension("lon", 4).unwrap();

    let mut lat = file.add_variable::<f64>("lat", &["lat"]).unwrap();
    lat.put_values(&[3.5, 2.5, 1.5, 0.5], ..).unwrap();
    let mut lon = file.add_variable::<f64>("lon", &["lon"]).unwrap();
    lon.put_values(&[0.5, 1.5, 2.5, 3.5], ..).unwrap();

    let values: Vec<f32> = SCENARIO_VALUES.iter().map(|v| v * scale + offset).collect();
    let mut var = file.add_variable::<f32>(variable, &["lat", "lon"]).unwrap();
    var.put_values(&values, ..).unwrap();
}

fn square(x: f64, y: f64, size: f64) -> Polygon {
    Polygon::new(PolygonRing::Outer(vec![
        Point::new(x, y),
        Point::new(x, y + size),
        Point::new(x + size, y + size),
        Point::new(x + size, y),
        Point::new(x, y),
    ]))
}

fn write_zones(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let table =
        TableWriterBuilder::new().add_character_field(FieldName::try_from("ZONE").unwrap(), 8);
    let mut writer = Writer::from_path(path, table).unwrap();
    for (id, polygon) in [("a", square(0.0, 2.0, 2.0)), ("b", square(2.0, 0.0, 2.0))] {
        let mut record = Record::default();
        record.insert("ZONE".to_string(), FieldValue::Character(Some(id.to_string())));
        writer.write_shape_and_record(&polygon, &record).unwrap();
    }
}

fn setup(root: &Path) -> AggregatorConfig {
    let input = root.join("raw");
    write_layer(&input.join("pm25/pm25_2022_JAN.nc"), "PM25", 1.0, 0.0);
    write_layer(&input.join("pm25/pm25_2022_FEB.nc"), "PM25", 1.0, 1.0);
    // Other years in the same directory are skipped.
    write_layer(&input.join("pm25/pm25_2021_DEC.nc"), "PM25", 1.0, 100.0);
    write_layer(&input.join("dust/dust_2022_JAN.nc"), "DUST", 2.0, 0.0);
    write_zones(&root.join("boundaries/zones_2020.shp"));

    parse_config(&format!(
        r#"
paths:
  input: {root}/raw
  intermediate: {root}/intermediate
  output: {root}/output
variables:
  - name: pm25
    layer: PM25
  - name: dust
    layer: DUST
boundaries:
  zones:
    id_field: ZONE
    vintages:
      2020: {root}/boundaries/zones_2020.shp
"#,
        root = root.display()
    ))
    .unwrap()
}

fn request(variable: &str) -> AggregateRequest {
    AggregateRequest {
        variable: variable.to_string(),
        polygons: "zones".to_string(),
        year: 2022,
        frequency: Frequency::Monthly,
    }
}

#[test]
fn test_aggregate_writes_long_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let registry = config.registry().unwrap();

    let outcome = aggregate(&config, &registry, &request("pm25")).unwrap();
    assert_eq!(outcome.vintage, 2020);
    assert_eq!(outcome.report.layers_processed, 2);
    assert_eq!(outcome.report.layers_skipped, 1);
    assert!(outcome
        .table_path
        .ends_with("intermediate/pm25/pm25__zones_monthly_2022.parquet"));
    assert!(outcome.report_path.exists());

    let table = read_long_table(&outcome.table_path, "pm25", "ZONE", Frequency::Monthly).unwrap();
    let jan = PeriodKey::monthly(2022, 1);
    let feb = PeriodKey::monthly(2022, 2);
    assert_eq!(table.value(&ZoneId::from("a"), jan), Some(Some(SCENARIO_MEAN_A)));
    assert_eq!(table.value(&ZoneId::from("b"), jan), Some(Some(SCENARIO_MEAN_B)));
    assert_eq!(table.value(&ZoneId::from("a"), feb), Some(Some(SCENARIO_MEAN_A + 1.0)));
}

/// Merged rows keyed by (zone, month), one value per requested column.
fn read_merged(path: &Path, columns: &[&str]) -> BTreeMap<(String, i32), Vec<Option<f64>>> {
    let file = std::fs::File::open(path).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();

    let mut rows = BTreeMap::new();
    for batch in reader {
        let batch = batch.unwrap();
        let column = |name: &str| batch.column_by_name(name).unwrap().clone();
        let ids = column("ZONE");
        let ids = ids.as_any().downcast_ref::<StringArray>().unwrap();
        let months = column("month");
        let months = months.as_any().downcast_ref::<Int32Array>().unwrap();
        let values: Vec<_> = columns.iter().map(|name| column(name)).collect();

        for row in 0..batch.num_rows() {
            let cells = values
                .iter()
                .map(|v| {
                    let v = v.as_any().downcast_ref::<Float64Array>().unwrap();
                    (!v.is_null(row)).then(|| v.value(row))
                })
                .collect();
            rows.insert((ids.value(row).to_string(), months.value(row)), cells);
        }
    }
    rows
}

#[test]
fn test_merge_outer_joins_variables() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let registry = config.registry().unwrap();

    aggregate(&config, &registry, &request("pm25")).unwrap();
    aggregate(&config, &registry, &request("dust")).unwrap();

    let variables = vec!["pm25".to_string(), "dust".to_string()];
    let path = merge(
        &config,
        &registry,
        &MergeRequest {
            variables,
            polygons: "zones".to_string(),
            year: 2022,
            frequency: Frequency::Monthly,
        },
    )
    .unwrap();
    assert!(path.ends_with("output/zones_monthly/merged__zones_monthly_2022.parquet"));

    let rows = read_merged(&path, &["dust", "pm25"]);
    assert_eq!(rows.len(), 4);

    let row = |zone: &str, month: i32| &rows[&(zone.to_string(), month)];
    assert_eq!(row("a", 1)[0], Some(2.0 * SCENARIO_MEAN_A));
    assert_eq!(row("b", 1)[0], Some(2.0 * SCENARIO_MEAN_B));
    assert_eq!(row("b", 2)[0], None);
    assert_eq!(row("b", 2)[1], Some(SCENARIO_MEAN_B + 1.0));
}

#[test]
fn test_merge_unknown_variable_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let registry = config.registry().unwrap();

    let err = merge(
        &config,
        &registry,
        &MergeRequest {
            variables: vec!["pm25".to_string(), "no2".to_string()],
            polygons: "zones".to_string(),
            year: 2022,
            frequency: Frequency::Monthly,
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("no2"));
}
