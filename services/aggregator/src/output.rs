//! Parquet persistence of long and wide statistic tables.
//!
//! Long tables have columns `<id>, year[, month], <variable>`; wide tables
//! have `<id>, year[, month]` followed by one column per variable. Ids are
//! stored as text, values as nullable Float64.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::info;
use zonal_common::{Frequency, PeriodKey, ZoneId};
use zonal_engine::{StatisticRecord, StatisticTable, WideTable};

/// Write one variable's long table.
pub fn write_long_table(path: &Path, table: &StatisticTable, id_column: &str) -> Result<()> {
    let keys: Vec<(&ZoneId, PeriodKey)> = table
        .records
        .iter()
        .map(|r| (&r.zone_id, r.period))
        .collect();
    let values: Vec<Option<f64>> = table.records.iter().map(|r| r.value).collect();

    let mut fields = key_fields(id_column, table.frequency);
    fields.push(Field::new(&table.variable, DataType::Float64, true));

    let mut columns = key_columns(&keys, table.frequency);
    columns.push(Arc::new(Float64Array::from(values)) as ArrayRef);

    write_batch(path, fields, columns)?;
    info!(path = %path.display(), rows = table.len(), variable = %table.variable, "Wrote long table");
    Ok(())
}

/// Read a long table written by [`write_long_table`].
pub fn read_long_table(
    path: &Path,
    variable: &str,
    id_column: &str,
    frequency: Frequency,
) -> Result<StatisticTable> {
    let mut table = StatisticTable::new(variable, frequency);

    for batch in read_batches(path)? {
        let periods = read_keys(&batch, id_column, frequency)?;
        let values = column::<Float64Array>(&batch, variable)?;
        for (row, (zone_id, period)) in periods.into_iter().enumerate() {
            table.records.push(StatisticRecord {
                zone_id,
                period,
                variable: variable.to_string(),
                value: optional(values, row),
            });
        }
    }

    Ok(table)
}

/// Write a merged wide table.
pub fn write_wide_table(path: &Path, table: &WideTable, id_column: &str) -> Result<()> {
    let keys: Vec<(&ZoneId, PeriodKey)> = table.rows.iter().map(|r| (&r.zone_id, r.period)).collect();

    let mut fields = key_fields(id_column, table.frequency);
    let mut columns = key_columns(&keys, table.frequency);
    for (i, variable) in table.variables.iter().enumerate() {
        fields.push(Field::new(variable, DataType::Float64, true));
        let values: Vec<Option<f64>> = table.rows.iter().map(|r| r.values[i]).collect();
        columns.push(Arc::new(Float64Array::from(values)) as ArrayRef);
    }

    write_batch(path, fields, columns)?;
    info!(
        path = %path.display(),
        rows = table.len(),
        variables = table.variables.len(),
        "Wrote wide table"
    );
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn key_fields(id_column: &str, frequency: Frequency) -> Vec<Field> {
    let mut fields = vec![
        Field::new(id_column, DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
    ];
    if frequency.has_month() {
        fields.push(Field::new("month", DataType::Int32, false));
    }
    fields
}

fn key_columns(keys: &[(&ZoneId, PeriodKey)], frequency: Frequency) -> Vec<ArrayRef> {
    let ids: Vec<String> = keys.iter().map(|(id, _)| id.to_string()).collect();
    let years: Vec<i32> = keys.iter().map(|(_, p)| p.year).collect();

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(Int32Array::from(years)),
    ];
    if frequency.has_month() {
        let months: Vec<i32> = keys
            .iter()
            .map(|(_, p)| p.month.unwrap_or_default() as i32)
            .collect();
        columns.push(Arc::new(Int32Array::from(months)));
    }
    columns
}

fn read_keys(
    batch: &RecordBatch,
    id_column: &str,
    frequency: Frequency,
) -> Result<Vec<(ZoneId, PeriodKey)>> {
    let ids = column::<StringArray>(batch, id_column)?;
    let years = column::<Int32Array>(batch, "year")?;
    let months = if frequency.has_month() {
        Some(column::<Int32Array>(batch, "month")?)
    } else {
        None
    };

    (0..batch.num_rows())
        .map(|row| {
            let zone_id = ZoneId::Text(ids.value(row).to_string());
            let year = years.value(row);
            let period = match months {
                Some(months) => {
                    let month = u32::try_from(months.value(row))
                        .with_context(|| format!("negative month in row {row}"))?;
                    PeriodKey::monthly(year, month)
                }
                None => PeriodKey::annual(year),
            };
            Ok((zone_id, period))
        })
        .collect()
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .with_context(|| format!("missing column '{name}'"))?
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("column '{name}' has an unexpected type"))
}

fn optional(values: &Float64Array, row: usize) -> Option<f64> {
    if values.is_null(row) {
        None
    } else {
        Some(values.value(row))
    }
}

fn write_batch(path: &Path, fields: Vec<Field>, columns: Vec<ArrayRef>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .with_context(|| format!("Failed to assemble record batch for {:?}", path))?;

    let file =
        File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn read_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Failed to read parquet metadata from {:?}", path))?
        .build()?;
    reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read record batches from {:?}", path))
}
