// ⏰ Temporal Precedence - Which source is authoritative when
//
// One cutoff date splits history in two:
//   - years before the cutoff year       → scraped source (B) only
//   - years after the cutoff year        → document source (A) only
//   - the cutoff year itself, by month   → B before the cutoff month,
//                                          A from the cutoff month on
//
// The split inside the cutoff year is month-granular: the day of the
// cutoff never matters.

use crate::record::{Record, Source};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CUTOFF
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cutoff {
    date: NaiveDate,
}

impl Cutoff {
    pub fn new(date: NaiveDate) -> Self {
        Cutoff { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// First day of the cutoff month: the earliest date source A is
    /// authoritative for
    pub fn month_start(&self) -> NaiveDate {
        self.date.with_day(1).unwrap_or(self.date)
    }

    /// Source that owns a given date
    pub fn authority_for(&self, date: NaiveDate) -> Source {
        if date.year() < self.year() {
            Source::Scraped
        } else if date.year() > self.year() {
            Source::Document
        } else if date.month() < self.month() {
            Source::Scraped
        } else {
            Source::Document
        }
    }

    /// True when the record comes from the source that owns its date
    pub fn admits(&self, record: &Record) -> bool {
        self.authority_for(record.date()) == record.source()
    }

    /// Coarse per-year policy
    pub fn policy_for_year(&self, year: i32) -> YearPolicy {
        if year < self.year() {
            YearPolicy::ScrapedOnly
        } else if year > self.year() {
            YearPolicy::DocumentOnly
        } else {
            YearPolicy::SplitAtMonth(self.month())
        }
    }
}

impl Default for Cutoff {
    fn default() -> Self {
        Cutoff::new(NaiveDate::from_ymd_opt(2014, 5, 1).unwrap_or_default())
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))
    }
}

// ============================================================================
// YEAR POLICY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearPolicy {
    /// Year strictly before the cutoff year
    ScrapedOnly,

    /// Year strictly after the cutoff year
    DocumentOnly,

    /// The cutoff year: B for months before, A for the month and after
    SplitAtMonth(u32),
}

impl YearPolicy {
    pub fn describe(&self) -> String {
        match self {
            YearPolicy::ScrapedOnly => "source B only".to_string(),
            YearPolicy::DocumentOnly => "source A only".to_string(),
            YearPolicy::SplitAtMonth(m) => format!("B before month {}, A from month {}", m, m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FunctionCode;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cutoff() -> Cutoff {
        Cutoff::new(date(2014, 5, 20))
    }

    #[test]
    fn test_authority_by_year() {
        assert_eq!(cutoff().authority_for(date(2013, 12, 31)), Source::Scraped);
        assert_eq!(cutoff().authority_for(date(2015, 1, 1)), Source::Document);
    }

    #[test]
    fn test_authority_in_cutoff_year_is_month_granular() {
        let c = cutoff();
        assert_eq!(c.authority_for(date(2014, 4, 30)), Source::Scraped);
        // Day before the cutoff day but same month → already A
        assert_eq!(c.authority_for(date(2014, 5, 2)), Source::Document);
        assert_eq!(c.authority_for(date(2014, 6, 1)), Source::Document);
    }

    #[test]
    fn test_admits_checks_source_against_authority() {
        let c = cutoff();
        let code = FunctionCode::normalize("044").unwrap();
        let b_april = Record::new(date(2014, 4, 10), code.clone(), "X", Source::Scraped);
        let a_april = Record::new(date(2014, 4, 10), code.clone(), "X", Source::Document);
        let a_june = Record::new(date(2014, 6, 1), code, "X", Source::Document);
        assert!(c.admits(&b_april));
        assert!(!c.admits(&a_april));
        assert!(c.admits(&a_june));
    }

    #[test]
    fn test_policy_for_year_and_month_start() {
        let c = cutoff();
        assert_eq!(c.policy_for_year(2010), YearPolicy::ScrapedOnly);
        assert_eq!(c.policy_for_year(2014), YearPolicy::SplitAtMonth(5));
        assert_eq!(c.policy_for_year(2020), YearPolicy::DocumentOnly);
        assert_eq!(c.month_start(), date(2014, 5, 1));
        assert_eq!(c.to_string(), "2014-05-20");
    }

    #[test]
    fn test_default_cutoff() {
        assert_eq!(Cutoff::default().date(), date(2014, 5, 1));
    }
}
