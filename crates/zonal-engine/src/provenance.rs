//! Period extraction from layer provenance strings.
//!
//! The batch driver never guesses a period: a parser either returns a
//! [`PeriodKey`] or a [`ZonalError::Provenance`] that aborts the batch.

use std::path::Path;

use zonal_common::{month_from_abbreviation, Frequency, PeriodKey, ZonalError, ZonalResult};

/// Strategy mapping a provenance string to the period it covers.
pub trait ProvenanceParser: Send + Sync {
    fn parse(&self, provenance: &str) -> ZonalResult<PeriodKey>;
}

impl<F> ProvenanceParser for F
where
    F: Fn(&str) -> ZonalResult<PeriodKey> + Send + Sync,
{
    fn parse(&self, provenance: &str) -> ZonalResult<PeriodKey> {
        self(provenance)
    }
}

/// Parses periods from file names.
///
/// Works on the file stem. The year is the first run of 4, 6 or 8 digits
/// starting with `19` or `20` (`YYYY`, `YYYYMM`, `YYYYMMDD`), or a 7-digit
/// `YYYYDDD-YYYYDDD` day-of-year range whose two ends share the year. For monthly
/// batches the month is the first upper-case `JAN`..`DEC` token not
/// preceded by a digit nor followed by a word character, falling back to a
/// `YYYYMM-YYYYMM` range whose two ends agree.
///
/// ```text
/// PM25_2022_JAN.nc                                  -> 2022-01
/// V5GL04.HybridPM25.NorthAmerica.202203-202203.nc   -> 2022-03
/// V5GL04.HybridPM25.NorthAmerica.202201-202212.nc   -> 2022 (annual)
/// SO4.NA.2022001-2022365.nc                         -> 2022 (annual)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilenamePeriodParser {
    pub frequency: Frequency,
}

impl FilenamePeriodParser {
    pub fn new(frequency: Frequency) -> Self {
        Self { frequency }
    }
}

impl ProvenanceParser for FilenamePeriodParser {
    fn parse(&self, provenance: &str) -> ZonalResult<PeriodKey> {
        let stem = Path::new(provenance)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| provenance.to_string());

        let runs = digit_runs(&stem);
        let year = (0..runs.len())
            .find_map(|i| year_at(&runs, i, &stem))
            .ok_or_else(|| ZonalError::provenance(provenance, "no 4-digit year found"))?;

        if !self.frequency.has_month() {
            return Ok(PeriodKey::annual(year));
        }

        let month = month_token(&stem)
            .or_else(|| month_range(&runs, &stem))
            .ok_or_else(|| {
                ZonalError::provenance(provenance, "no month abbreviation or YYYYMM-YYYYMM range found")
            })?;

        Ok(PeriodKey::monthly(year, month))
    }
}

/// Maximal ASCII digit runs with their byte offsets.
fn digit_runs(s: &str) -> Vec<(usize, &str)> {
    let bytes = s.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            runs.push((start, &s[start..i]));
        } else {
            i += 1;
        }
    }
    runs
}

/// Year carried by the `i`-th digit run, if it is a date token.
fn year_at(runs: &[(usize, &str)], i: usize, s: &str) -> Option<i32> {
    let (_, run) = runs[i];
    if !(run.starts_with("19") || run.starts_with("20")) {
        return None;
    }
    let accepted = match run.len() {
        4 | 6 | 8 => true,
        7 => range_partner(runs, i, s).is_some_and(|end| end.len() == 7 && end[..4] == run[..4]),
        _ => false,
    };
    if accepted {
        run[..4].parse().ok()
    } else {
        None
    }
}

/// The run following the `i`-th one when exactly one `-` separates them.
fn range_partner<'a>(runs: &[(usize, &'a str)], i: usize, s: &str) -> Option<&'a str> {
    let (start_a, a) = runs[i];
    let &(start_b, b) = runs.get(i + 1)?;
    let end_a = start_a + a.len();
    (start_b == end_a + 1 && s.as_bytes()[end_a] == b'-').then_some(b)
}

fn month_token(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.len() < 3 {
        return None;
    }
    (0..=bytes.len() - 3).find_map(|i| {
        let token = &bytes[i..i + 3];
        if !token.iter().all(u8::is_ascii_uppercase) {
            return None;
        }
        if i > 0 && bytes[i - 1].is_ascii_digit() {
            return None;
        }
        if let Some(&next) = bytes.get(i + 3) {
            if next.is_ascii_alphanumeric() || next == b'_' {
                return None;
            }
        }
        std::str::from_utf8(token).ok().and_then(month_from_abbreviation)
    })
}

/// Month of a `YYYYMM-YYYYMM` range covering a single month.
fn month_range(runs: &[(usize, &str)], s: &str) -> Option<u32> {
    (0..runs.len()).find_map(|i| {
        let (_, a) = runs[i];
        let b = range_partner(runs, i, s)?;
        if !(a.len() == 6 && a == b) {
            return None;
        }
        a[4..].parse::<u32>().ok().filter(|m| (1..=12).contains(m))
    })
}
