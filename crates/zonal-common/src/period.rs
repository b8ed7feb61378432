//! Period keys for time-stamped layers.

use std::fmt;
use std::str::FromStr;

use chrono::Month;
use serde::{Deserialize, Serialize};

/// Temporal frequency of a batch of layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One layer per year
    Annual,
    /// One layer per month
    Monthly,
}

impl Frequency {
    /// Whether period keys of this frequency carry a month.
    pub fn has_month(&self) -> bool {
        matches!(self, Frequency::Monthly)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Annual => f.write_str("annual"),
            Frequency::Monthly => f.write_str("monthly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "annual" | "yearly" => Ok(Frequency::Annual),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unsupported frequency '{other}'")),
        }
    }
}

/// The period a layer (and every record derived from it) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    /// 1-based month, present only for sub-annual batches
    pub month: Option<u32>,
}

impl PeriodKey {
    pub fn annual(year: i32) -> Self {
        Self { year, month: None }
    }

    pub fn monthly(year: i32, month: u32) -> Self {
        Self {
            year,
            month: Some(month),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{}-{:02}", self.year, m),
            None => write!(f, "{}", self.year),
        }
    }
}

/// Map a 3-letter English month abbreviation (any case) to its number.
pub fn month_from_abbreviation(token: &str) -> Option<u32> {
    if token.len() != 3 {
        return None;
    }
    Month::from_str(token).ok().map(|m| m.number_from_month())
}
