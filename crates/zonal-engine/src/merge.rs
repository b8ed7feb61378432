//! Outer join of per-variable long tables into one wide table.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use zonal_common::{Frequency, PeriodKey, ZonalError, ZonalResult, ZoneId};

use crate::table::StatisticTable;

/// One zone and period with a value slot per variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub zone_id: ZoneId,
    pub period: PeriodKey,
    /// Aligned with [`WideTable::variables`]
    pub values: Vec<Option<f64>>,
}

/// Wide-format result, rows ordered by (zone, period).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideTable {
    pub frequency: Frequency,
    /// Variable columns, lexicographically sorted
    pub variables: Vec<String>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    /// Output column names: id, year, month (sub-annual only), variables.
    pub fn column_names(&self, id_column: &str) -> Vec<String> {
        let mut columns = vec![id_column.to_string(), "year".to_string()];
        if self.frequency.has_month() {
            columns.push("month".to_string());
        }
        columns.extend(self.variables.iter().cloned());
        columns
    }

    /// Value of `variable` for a key. Outer `None` when the key or variable
    /// is unknown, inner `None` when the value is missing.
    pub fn value(&self, zone_id: &ZoneId, period: PeriodKey, variable: &str) -> Option<Option<f64>> {
        let col = self.variables.iter().position(|v| v == variable)?;
        self.rows
            .iter()
            .find(|r| &r.zone_id == zone_id && r.period == period)
            .map(|r| r.values[col])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Merge per-variable tables on (zone id, period).
///
/// The key set of the result is the union of all input keys. A variable
/// with no record for a key is `None` in that row.
pub fn merge_wide(tables: &[StatisticTable]) -> ZonalResult<WideTable> {
    let Some(first) = tables.first() else {
        return Err(ZonalError::configuration("no tables to merge"));
    };
    let frequency = first.frequency;

    if let Some(other) = tables.iter().find(|t| t.frequency != frequency) {
        return Err(ZonalError::configuration(format!(
            "cannot merge {} table '{}' with {} table '{}'",
            other.frequency, other.variable, frequency, first.variable
        )));
    }

    let names: BTreeSet<&str> = tables.iter().map(|t| t.variable.as_str()).collect();
    if names.len() != tables.len() {
        return Err(ZonalError::configuration(
            "variable names must be unique across merged tables",
        ));
    }

    let variables: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    let width = variables.len();
    let mut rows: BTreeMap<(ZoneId, PeriodKey), Vec<Option<f64>>> = BTreeMap::new();

    for table in tables {
        let col = variables
            .iter()
            .position(|v| *v == table.variable)
            .ok_or_else(|| ZonalError::configuration(format!("unknown variable '{}'", table.variable)))?;

        let mut seen = HashSet::with_capacity(table.records.len());
        for record in &table.records {
            if !seen.insert((&record.zone_id, record.period)) {
                return Err(ZonalError::DuplicateRecord(format!(
                    "{} / {} in '{}'",
                    record.zone_id, record.period, table.variable
                )));
            }
            rows.entry((record.zone_id.clone(), record.period))
                .or_insert_with(|| vec![None; width])[col] = record.value;
        }
    }

    let rows: Vec<WideRow> = rows
        .into_iter()
        .map(|((zone_id, period), values)| WideRow {
            zone_id,
            period,
            values,
        })
        .collect();

    info!(
        variables = ?variables,
        rows = rows.len(),
        frequency = %frequency,
        "Merged variable tables"
    );

    Ok(WideTable {
        frequency,
        variables,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(variable: &str, frequency: Frequency, rows: &[(&str, i32, Option<f64>)]) -> StatisticTable {
        let mut t = StatisticTable::new(variable, frequency);
        for (id, year, value) in rows {
            t.push_period(PeriodKey::annual(*year), &[ZoneId::from(*id)], vec![*value]);
        }
        t
    }

    #[test]
    fn test_columns_sorted_independent_of_input_order() {
        let a = table("so4", Frequency::Annual, &[("x", 2020, Some(1.0))]);
        let b = table("bc", Frequency::Annual, &[("x", 2020, Some(2.0))]);

        let ab = merge_wide(&[a.clone(), b.clone()]).unwrap();
        let ba = merge_wide(&[b, a]).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.column_names("county"), vec!["county", "year", "bc", "so4"]);
        assert_eq!(ab.rows[0].values, vec![Some(2.0), Some(1.0)]);
    }

    #[test]
    fn test_monthly_columns_include_month() {
        let mut t = StatisticTable::new("pm25", Frequency::Monthly);
        t.push_period(PeriodKey::monthly(2022, 1), &["z".into()], vec![Some(1.0)]);
        let wide = merge_wide(&[t]).unwrap();
        assert_eq!(wide.column_names("zcta"), vec!["zcta", "year", "month", "pm25"]);
    }

    #[test]
    fn test_missing_value_kept_distinct_from_absent_record() {
        let a = table("a", Frequency::Annual, &[("x", 2020, None)]);
        let wide = merge_wide(&[a]).unwrap();
        assert_eq!(wide.len(), 1);
        assert_eq!(wide.value(&"x".into(), PeriodKey::annual(2020), "a"), Some(None));
        assert_eq!(wide.value(&"x".into(), PeriodKey::annual(2020), "b"), None);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(merge_wide(&[]).unwrap_err().is_configuration());

        let a = table("a", Frequency::Annual, &[("x", 2020, Some(1.0))]);
        let a2 = table("a", Frequency::Annual, &[("y", 2020, Some(1.0))]);
        assert!(merge_wide(&[a.clone(), a2]).unwrap_err().is_configuration());

        let m = StatisticTable::new("m", Frequency::Monthly);
        assert!(merge_wide(&[a, m]).unwrap_err().is_configuration());

        let dup = table("d", Frequency::Annual, &[("x", 2020, Some(1.0)), ("x", 2020, Some(2.0))]);
        assert!(matches!(
            merge_wide(&[dup]).unwrap_err(),
            ZonalError::DuplicateRecord(_)
        ));
    }
}
