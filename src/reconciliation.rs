// ⚖️ Reconciliation Engine - Merge document (A) and scraped (B) histories
//
// Per calendar year present in either source:
//   1. select records from the authoritative source (see `temporal`)
//   2. deduplicate by (function, location), earliest date wins
//   3. emit ascending by date
//
// Years never mix: a key may appear once in every year.

use crate::deduplication::{DeduplicationEngine, DuplicateMatch};
use crate::logging::LogSink;
use crate::record::{Record, RecordsByYear, Source, YearlyRecordSet};
use crate::temporal::{Cutoff, YearPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub policy: YearPolicy,
    pub from_document: usize,
    pub from_scraped: usize,
    pub excluded_by_policy: usize,
    pub duplicates_discarded: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub cutoff: Cutoff,
    pub history: YearlyRecordSet,
    pub years: Vec<YearSummary>,
    pub duplicates: Vec<DuplicateMatch>,
    pub gap_years_filled: usize,
}

impl ReconciliationReport {
    pub fn total_records(&self) -> usize {
        self.history.len()
    }

    pub fn summary(&self) -> String {
        let from_a: usize = self.years.iter().map(|y| y.from_document).sum();
        let from_b: usize = self.years.iter().map(|y| y.from_scraped).sum();
        let excluded: usize = self.years.iter().map(|y| y.excluded_by_policy).sum();
        format!(
            "Reconciliation (cutoff {}): {} years, {} records ({} from A, {} from B), {} excluded by cutoff, {} duplicates discarded",
            self.cutoff,
            self.history.years().count(),
            self.total_records(),
            from_a,
            from_b,
            excluded,
            self.duplicates.len()
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    pub cutoff: Cutoff,

    /// Insert empty years between the first and last year with data
    pub fill_gap_years: bool,

    dedup: DeduplicationEngine,
}

impl ReconciliationEngine {
    pub fn new(cutoff: Cutoff) -> Self {
        ReconciliationEngine {
            cutoff,
            fill_gap_years: false,
            dedup: DeduplicationEngine::new(),
        }
    }

    pub fn with_gap_years(mut self, fill: bool) -> Self {
        self.fill_gap_years = fill;
        self
    }

    /// Merge both sources into the final per-year history
    ///
    /// Example:
    /// ```
    /// use funcoes_mdl::{Cutoff, MemorySink, ReconciliationEngine, RecordsByYear};
    /// use chrono::NaiveDate;
    ///
    /// let engine = ReconciliationEngine::new(Cutoff::new(NaiveDate::from_ymd_opt(2014, 5, 1).unwrap()));
    /// let report = engine.reconcile(&RecordsByYear::new(), &RecordsByYear::new(), &MemorySink::new());
    /// assert!(report.history.is_empty());
    /// ```
    pub fn reconcile(
        &self,
        document: &RecordsByYear,
        scraped: &RecordsByYear,
        log: &dyn LogSink,
    ) -> ReconciliationReport {
        let years: BTreeSet<i32> = document.years().chain(scraped.years()).collect();

        let mut history = YearlyRecordSet::new();
        let mut summaries = Vec::with_capacity(years.len());
        let mut duplicates = Vec::new();

        for year in years {
            let policy = self.cutoff.policy_for_year(year);
            let candidates = document.year(year).iter().chain(scraped.year(year).iter());

            let mut selected = Vec::new();
            let mut excluded = 0;
            for record in candidates {
                if self.cutoff.admits(record) {
                    selected.push(record.clone());
                } else {
                    excluded += 1;
                }
            }

            let outcome = self.dedup.deduplicate(selected, log);
            let from_document = count_source(&outcome.kept, Source::Document);
            let summary = YearSummary {
                year,
                policy,
                from_document,
                from_scraped: outcome.kept.len() - from_document,
                excluded_by_policy: excluded,
                duplicates_discarded: outcome.duplicates.len(),
            };
            log.debug(&format!(
                "Year {} ({}): {} kept, {} excluded, {} duplicates",
                year,
                policy.describe(),
                outcome.kept.len(),
                excluded,
                outcome.duplicates.len()
            ));

            history.set_year(year, outcome.kept);
            duplicates.extend(outcome.duplicates);
            summaries.push(summary);
        }

        let gap_years_filled = if self.fill_gap_years {
            history.fill_gap_years()
        } else {
            0
        };

        let report = ReconciliationReport {
            cutoff: self.cutoff,
            history,
            years: summaries,
            duplicates,
            gap_years_filled,
        };
        log.info(&report.summary());
        report
    }
}

fn count_source(records: &[Record], source: Source) -> usize {
    records.iter().filter(|r| r.source() == source).count()
}

// ============================================================================
// TESTS
// ============================================================================
