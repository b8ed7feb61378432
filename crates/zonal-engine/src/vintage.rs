//! Boundary vintage resolution.
//!
//! Boundary datasets exist for a sparse set of years. A requested year is
//! matched to one of them either by floor (most recent vintage known as of
//! that year) or by ceiling (earliest vintage at or after it).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use zonal_common::{ZonalError, ZonalResult};

/// Tie-break direction for vintage selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VintageDirection {
    /// Largest vintage <= year, else the smallest vintage.
    #[default]
    Floor,
    /// Smallest vintage >= year, else the largest vintage.
    Ceiling,
}

/// Pick the vintage to use for `year`. Returns `None` only when `available`
/// is empty.
pub fn resolve_vintage(
    year: i32,
    available: &BTreeSet<i32>,
    direction: VintageDirection,
) -> Option<i32> {
    match direction {
        VintageDirection::Floor => available
            .range(..=year)
            .next_back()
            .or_else(|| available.first())
            .copied(),
        VintageDirection::Ceiling => available
            .range(year..)
            .next()
            .or_else(|| available.last())
            .copied(),
    }
}

/// Year-keyed table of boundary datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VintageTable<V> {
    entries: BTreeMap<i32, V>,
}

impl<V> VintageTable<V> {
    pub fn new(entries: BTreeMap<i32, V>) -> Self {
        Self { entries }
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.entries.keys().copied().collect()
    }

    /// Resolve `year` to the selected vintage year and its entry.
    pub fn resolve(&self, year: i32, direction: VintageDirection) -> ZonalResult<(i32, &V)> {
        let chosen = resolve_vintage(year, &self.years(), direction)
            .ok_or_else(|| ZonalError::configuration("no boundary vintages available"))?;
        let entry = self
            .entries
            .get(&chosen)
            .ok_or_else(|| ZonalError::configuration(format!("vintage {chosen} disappeared")))?;
        Ok((chosen, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> FromIterator<(i32, V)> for VintageTable<V> {
    fn from_iter<I: IntoIterator<Item = (i32, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
