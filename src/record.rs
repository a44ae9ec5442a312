// 🧾 Records - Dated role assignments from either source
//
// A Record is a value: once built it never changes. The 3-digit function
// code is normalized at construction, so every Record downstream already
// satisfies the code invariant.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// SOURCE TAG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Source {
    /// A: records recovered from the multi-report document
    Document,

    /// B: records collected by the external scraper
    Scraped,
}

impl Source {
    pub fn code(&self) -> &'static str {
        match self {
            Source::Document => "A",
            Source::Scraped => "B",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Source::Document => "document report",
            Source::Scraped => "scraped dataset",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// FUNCTION CODE
// ============================================================================

/// Exactly three ASCII digits, zero-padded
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionCode(String);

impl FunctionCode {
    /// Normalize "44" → "044". Accepts 1-3 digits after trimming, nothing else.
    pub fn normalize(raw: &str) -> Option<FunctionCode> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > 3 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(FunctionCode(format!("{:0>3}", trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FunctionCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FunctionCode::normalize(&value).ok_or_else(|| format!("invalid function code: {:?}", value))
    }
}

impl From<FunctionCode> for String {
    fn from(code: FunctionCode) -> Self {
        code.0
    }
}

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    date: NaiveDate,
    function_code: FunctionCode,
    location: String,
    source: Source,
}

/// Composite key used for deduplication within a year
pub type RecordKey = (FunctionCode, String);

impl Record {
    pub fn new(date: NaiveDate, function_code: FunctionCode, location: impl Into<String>, source: Source) -> Self {
        Record {
            date,
            function_code,
            location: location.into(),
            source,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn function_code(&self) -> &FunctionCode {
        &self.function_code
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn key(&self) -> RecordKey {
        (self.function_code.clone(), self.location.clone())
    }

    /// Total order used everywhere records are sorted: date first, then
    /// code, location and source so ties are reproducible
    pub fn chronological_cmp(&self, other: &Record) -> std::cmp::Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.function_code.cmp(&other.function_code))
            .then_with(|| self.location.cmp(&other.location))
            .then_with(|| self.source.cmp(&other.source))
    }
}

// ============================================================================
// DATE PARSING
// ============================================================================

/// Strict day-first parse ("10/05/2014"), with ISO as the second format
pub fn parse_record_date(date_str: &str) -> Option<NaiveDate> {
    let trimmed = date_str.trim();

    // Try DD/MM/YYYY
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
        return Some(date);
    }

    // Try YYYY-MM-DD
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    None
}

// ============================================================================
// RECORDS BY YEAR (engine input)
// ============================================================================

/// Per-year record lists as produced by a source. Exact duplicates collapse,
/// but the same (code, location) may appear on several dates; only the
/// reconciliation engine decides which of those survive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordsByYear {
    years: BTreeMap<i32, Vec<Record>>,
}

impl RecordsByYear {
    pub fn new() -> Self {
        RecordsByYear::default()
    }

    /// Insert keeping each year sorted; identical records are ignored
    pub fn insert(&mut self, record: Record) -> bool {
        let bucket = self.years.entry(record.year()).or_default();
        match bucket.binary_search_by(|probe| probe.chronological_cmp(&record)) {
            Ok(_) => false,
            Err(pos) => {
                bucket.insert(pos, record);
                true
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = Record>>(&mut self, records: I) {
        for record in records {
            self.insert(record);
        }
    }

    /// Make a year present even if it has no records
    pub fn touch_year(&mut self, year: i32) {
        self.years.entry(year).or_default();
    }

    pub fn year(&self, year: i32) -> &[Record] {
        self.years.get(&year).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &[Record])> {
        self.years.iter().map(|(y, v)| (*y, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.years.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Record> for RecordsByYear {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut set = RecordsByYear::new();
        set.extend(iter);
        set
    }
}

// ============================================================================
// YEARLY RECORD SET (engine output)
// ============================================================================

/// Final artifact: per year, at most one record per (code, location),
/// ascending by date. Years with zero records are representable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearlyRecordSet {
    years: BTreeMap<i32, Vec<Record>>,
}

impl YearlyRecordSet {
    pub fn new() -> Self {
        YearlyRecordSet::default()
    }

    /// Only the reconciliation engine builds these; the caller guarantees
    /// `records` is already deduplicated and sorted
    pub(crate) fn set_year(&mut self, year: i32, records: Vec<Record>) {
        self.years.insert(year, records);
    }

    /// Insert empty years between the first and last year present
    pub fn fill_gap_years(&mut self) -> usize {
        let (first, last) = match (self.years.keys().next(), self.years.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0,
        };
        let mut added = 0;
        for year in first..=last {
            if !self.years.contains_key(&year) {
                self.years.insert(year, Vec::new());
                added += 1;
            }
        }
        added
    }

    pub fn year(&self, year: i32) -> Option<&[Record]> {
        self.years.get(&year).map(|v| v.as_slice())
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &[Record])> {
        self.years.iter().map(|(y, v)| (*y, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.years.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
