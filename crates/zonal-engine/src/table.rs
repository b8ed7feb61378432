//! Long-format statistic tables.

use serde::{Deserialize, Serialize};

use zonal_common::{Frequency, PeriodKey, ZoneId};

/// One reduced value for one zone and period of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRecord {
    pub zone_id: ZoneId,
    pub period: PeriodKey,
    pub variable: String,
    /// `None` when the zone had no valid cell
    pub value: Option<f64>,
}

/// All records of one variable, one row per zone per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticTable {
    pub variable: String,
    pub frequency: Frequency,
    pub records: Vec<StatisticRecord>,
}

impl StatisticTable {
    pub fn new(variable: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            variable: variable.into(),
            frequency,
            records: Vec::new(),
        }
    }

    /// Append one period's values, zipped with the zone ids they belong to.
    pub fn push_period(&mut self, period: PeriodKey, zone_ids: &[ZoneId], values: Vec<Option<f64>>) {
        self.records.extend(zone_ids.iter().zip(values).map(|(id, value)| StatisticRecord {
            zone_id: id.clone(),
            period,
            variable: self.variable.clone(),
            value,
        }));
    }

    /// Order records by period. Zone order within a period is kept.
    pub fn sort_by_period(&mut self) {
        self.records.sort_by_key(|r| r.period);
    }

    /// Value for a zone and period, if a record exists.
    pub fn value(&self, zone_id: &ZoneId, period: PeriodKey) -> Option<Option<f64>> {
        self.records
            .iter()
            .find(|r| &r.zone_id == zone_id && r.period == period)
            .map(|r| r.value)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_sort_keeps_zone_order() {
        let ids = vec![ZoneId::from("b"), ZoneId::from("a")];
        let mut table = StatisticTable::new("pm25", Frequency::Monthly);
        table.push_period(PeriodKey::monthly(2022, 2), &ids, vec![Some(1.0), None]);
        table.push_period(PeriodKey::monthly(2022, 1), &ids, vec![Some(3.0), Some(4.0)]);
        table.sort_by_period();

        let order: Vec<(String, Option<u32>)> = table
            .records
            .iter()
            .map(|r| (r.zone_id.to_string(), r.period.month))
            .collect();
        assert_eq!(
            order,
            vec![
                ("b".to_string(), Some(1)),
                ("a".to_string(), Some(1)),
                ("b".to_string(), Some(2)),
                ("a".to_string(), Some(2)),
            ]
        );
        assert_eq!(table.value(&"a".into(), PeriodKey::monthly(2022, 2)), Some(None));
        assert_eq!(table.records[0].variable, "pm25");
    }
}
