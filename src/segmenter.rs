// 📑 Report Segmenter - Finds report boundaries in a flat page stream
//
// One document holds several independent reports back to back. A report
// starts on a page carrying a "Página 1 de N" marker AND a labeled header
// date. Pages in between belong to the active report, if any.
//
//   NoActiveReport --boundary(date >= cutoff)--> ActiveReport
//   NoActiveReport --boundary(date <  cutoff)--> NoActiveReport
//   ActiveReport   --boundary(any)-------------> flush, then as above
//   ActiveReport   --boundary(bad date)--------> flush, NoActiveReport
//   ActiveReport   --page----------------------> accumulate entries
//   end of stream: flush

use crate::logging::LogSink;
use crate::parser::{Entry, Page, RowExtractor};
use crate::record::{parse_record_date, Record, RecordsByYear, Source};
use crate::resolver::LocationResolver;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Used when a report's first table carries no location
pub const UNKNOWN_LOCATION: &str = "LOTAÇÃO NÃO IDENTIFICADA";

// ============================================================================
// BOUNDARY DETECTION
// ============================================================================

static FIRST_PAGE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)(?:p[áa]gina|page)\s*1(?:\s*$|\s*(?:de|of)\s*\d+)").expect("valid regex")
});

static DATE_IN_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2}/\d{2}/\d{4})").expect("valid regex"));

/// Header-date patterns tried after the header-line rule, most specific first
static HEADER_DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"Data Consulta\s*:?\s*(\d{2}/\d{2}/\d{4})",
        r"(?i)data\s+(?:da\s+|de\s+)?consulta\s*:?\s*(\d{2}/\d{2}/\d{4})",
        r"(?i)data\s+(?:da\s+|de\s+)?emiss[ãa]o\s*:?\s*(\d{2}/\d{2}/\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Column headers that sit directly above the header values line
pub const HEADER_TOKENS: &[&str] = &["Data Consulta", "CPF", "Nome", "Vínculo"];

pub fn has_first_page_marker(text: &str) -> bool {
    FIRST_PAGE_MARKER.is_match(text)
}

/// Header date string of a report's first page, or `None` when the page
/// does not start a report
pub fn detect_report_start(text: &str) -> Option<String> {
    if !has_first_page_marker(text) {
        return None;
    }

    // Rule 1: header line with every column token, date on the next line
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if HEADER_TOKENS.iter().all(|token| line.contains(token)) {
            if let Some(value_line) = lines.get(i + 1) {
                if let Some(caps) = DATE_IN_LINE.captures(value_line) {
                    return Some(caps[1].to_string());
                }
            }
        }
    }

    // Rules 2..n: labeled date anywhere on the page
    HEADER_DATE_PATTERNS
        .iter()
        .find_map(|re| re.captures(text).map(|caps| caps[1].to_string()))
}

// ============================================================================
// STATE
// ============================================================================

/// Transient per-report state; discarded after flush
#[derive(Debug, Clone, PartialEq)]
pub struct ReportAccumulator {
    pub report_date: NaiveDate,
    pub pending: BTreeSet<Entry>,
    pub default_location: String,
}

impl ReportAccumulator {
    pub fn new(report_date: NaiveDate, default_location: String) -> Self {
        ReportAccumulator {
            report_date,
            pending: BTreeSet::new(),
            default_location,
        }
    }

    /// Every pending pair becomes a source-A record dated with the header date
    pub fn into_records(self) -> impl Iterator<Item = Record> {
        let date = self.report_date;
        self.pending
            .into_iter()
            .map(move |(code, location)| Record::new(date, code, location, Source::Document))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmenterState {
    NoActiveReport,
    ActiveReport(ReportAccumulator),
}

/// What a single page did to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Boundary with a valid date; a new report is active
    ReportStarted(NaiveDate),

    /// Boundary dated before the validity cutoff
    ReportDiscarded(NaiveDate),

    /// Boundary whose date string failed to parse
    InvalidBoundary(String),

    /// Non-boundary page added this many entries to the active report
    Accumulated(usize),

    /// Non-boundary page with no active report
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmenterStats {
    pub pages: usize,
    pub reports_started: usize,
    pub reports_discarded: usize,
    pub invalid_boundaries: usize,
    pub records_flushed: usize,
}

// ============================================================================
// SEGMENTER
// ============================================================================

pub struct ReportSegmenter<'a> {
    extractor: RowExtractor<'a>,
    validity_cutoff: NaiveDate,
    state: SegmenterState,
    output: RecordsByYear,
    stats: SegmenterStats,
}

impl<'a> ReportSegmenter<'a> {
    /// Reports dated before `validity_cutoff` are discarded
    pub fn new(resolver: &'a LocationResolver<'a>, validity_cutoff: NaiveDate) -> Self {
        ReportSegmenter {
            extractor: RowExtractor::new(resolver),
            validity_cutoff,
            state: SegmenterState::NoActiveReport,
            output: RecordsByYear::new(),
            stats: SegmenterStats::default(),
        }
    }

    pub fn state(&self) -> &SegmenterState {
        &self.state
    }

    pub fn output(&self) -> &RecordsByYear {
        &self.output
    }

    pub fn stats(&self) -> &SegmenterStats {
        &self.stats
    }

    /// Drive the machine with the next page in document order
    pub fn process_page(&mut self, page: &Page, log: &dyn LogSink) -> PageOutcome {
        self.stats.pages += 1;
        let page_num = self.stats.pages;

        let boundary_date = page.text.as_deref().and_then(detect_report_start);
        match boundary_date {
            Some(date_str) => self.on_boundary(page_num, &date_str, page, log),
            None => self.on_page(page_num, page, log),
        }
    }

    /// Flush whatever is active and hand back the per-year output
    pub fn finish(mut self, log: &dyn LogSink) -> (RecordsByYear, SegmenterStats) {
        self.flush(log);
        log.info(&format!(
            "Segmentation done: {} pages, {} reports kept, {} before cutoff, {} invalid, {} records",
            self.stats.pages,
            self.stats.reports_started,
            self.stats.reports_discarded,
            self.stats.invalid_boundaries,
            self.stats.records_flushed
        ));
        (self.output, self.stats)
    }

    fn on_boundary(&mut self, page_num: usize, date_str: &str, page: &Page, log: &dyn LogSink) -> PageOutcome {
        self.flush(log);

        let report_date = match parse_record_date(date_str) {
            Some(date) => date,
            None => {
                log.warn(&format!("Page {}: report date '{}' does not parse; report skipped", page_num, date_str));
                self.stats.invalid_boundaries += 1;
                return PageOutcome::InvalidBoundary(date_str.to_string());
            }
        };

        if report_date < self.validity_cutoff {
            log.info(&format!(
                "Page {}: report dated {} predates cutoff {}; discarded",
                page_num, date_str, self.validity_cutoff
            ));
            self.stats.reports_discarded += 1;
            return PageOutcome::ReportDiscarded(report_date);
        }

        let default_location = self
            .extractor
            .recover_default_location(&page.tables)
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
        log.debug(&format!(
            "Page {}: new report dated {} at {}",
            page_num, date_str, default_location
        ));

        let mut acc = ReportAccumulator::new(report_date, default_location);
        // The first page usually carries rows of its own
        acc.pending
            .extend(self.extractor.extract(&page.tables, &acc.default_location, log));
        self.state = SegmenterState::ActiveReport(acc);
        self.stats.reports_started += 1;

        PageOutcome::ReportStarted(report_date)
    }

    fn on_page(&mut self, page_num: usize, page: &Page, log: &dyn LogSink) -> PageOutcome {
        match &mut self.state {
            SegmenterState::NoActiveReport => PageOutcome::Ignored,
            SegmenterState::ActiveReport(acc) => {
                let entries = self.extractor.extract(&page.tables, &acc.default_location, log);
                let before = acc.pending.len();
                acc.pending.extend(entries);
                let added = acc.pending.len() - before;
                if added == 0 {
                    log.debug(&format!("Page {}: no new entries", page_num));
                }
                PageOutcome::Accumulated(added)
            }
        }
    }

    fn flush(&mut self, log: &dyn LogSink) {
        let state = std::mem::replace(&mut self.state, SegmenterState::NoActiveReport);
        if let SegmenterState::ActiveReport(acc) = state {
            if acc.pending.is_empty() {
                log.debug(&format!("Report dated {} had no entries", acc.report_date));
                return;
            }
            let date = acc.report_date;
            let pending = acc.pending.len();
            let mut inserted = 0;
            for record in acc.into_records() {
                if self.output.insert(record) {
                    inserted += 1;
                }
            }
            self.stats.records_flushed += inserted;
            if inserted < pending {
                log.debug(&format!(
                    "Report dated {}: {} entries already present from an earlier report",
                    date,
                    pending - inserted
                ));
            }
            log.info(&format!("Report dated {}: {} entries flushed", date, inserted));
        }
    }
}

/// Run the whole page stream through a fresh segmenter. `progress` sees
/// the completed fraction after each page.
pub fn segment_pages(
    pages: &[Page],
    resolver: &LocationResolver<'_>,
    validity_cutoff: NaiveDate,
    mut progress: Option<&mut dyn FnMut(f64)>,
    log: &dyn LogSink,
) -> (RecordsByYear, SegmenterStats) {
    let mut segmenter = ReportSegmenter::new(resolver, validity_cutoff);
    let total = pages.len();

    for (i, page) in pages.iter().enumerate() {
        segmenter.process_page(page, log);
        if let Some(cb) = progress.as_mut() {
            cb((i + 1) as f64 / total as f64);
        }
    }

    segmenter.finish(log)
}
