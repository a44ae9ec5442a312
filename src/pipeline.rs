// 🔗 History Pipeline - pages + scraped rows → reconciled yearly history
//
// pages ─▶ segmenter (row extractor per page) ─▶ source A ┐
//                                                          ├─▶ reconciliation
// scraped rows ─▶ resolver ─────────────────────▶ source B ┘
//
// Heuristic misses are absorbed along the way. A collaborator that cannot
// deliver at all fails the whole call.

use crate::catalog::LocationCatalog;
use crate::config::Config;
use crate::error::{HistoryError, Result};
use crate::logging::LogSink;
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::record::Source;
use crate::resolver::{LocationResolver, DEFAULT_FUZZY_THRESHOLD};
use crate::segmenter::{segment_pages, SegmenterStats};
use crate::sources::{scraped_rows_to_records, PageSource, ScrapedSource};
use crate::temporal::Cutoff;

/// Reconciled history plus what the segmenter saw on the way
#[derive(Debug, Clone)]
pub struct HistoryOutcome {
    pub report: ReconciliationReport,
    pub segmentation: SegmenterStats,
}

/// End-to-end builder: one catalog, one cutoff, any pair of sources
pub struct HistoryBuilder<'a> {
    locations: &'a LocationCatalog,
    cutoff: Cutoff,
    fuzzy_threshold: f64,
    fill_gap_years: bool,
}

impl<'a> HistoryBuilder<'a> {
    pub fn new(locations: &'a LocationCatalog, cutoff: Cutoff) -> Self {
        HistoryBuilder {
            locations,
            cutoff,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fill_gap_years: false,
        }
    }

    /// Cutoff, fuzzy threshold and gap-year fill taken from `config`
    pub fn from_config(locations: &'a LocationCatalog, config: &Config) -> Self {
        HistoryBuilder::new(locations, config.cutoff())
            .with_fuzzy_threshold(config.resolver.fuzzy_threshold)
            .with_gap_years(config.reconciliation.fill_gap_years)
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_gap_years(mut self, fill: bool) -> Self {
        self.fill_gap_years = fill;
        self
    }

    /// Load both sources and reconcile them into the yearly history
    ///
    /// `progress` sees the completed page fraction. Fails with
    /// `SourceUnavailable` when either source cannot load at all and with
    /// `EmptyDocument` when the document has no pages; every per-page or
    /// per-row miss is logged and absorbed.
    pub fn build(
        &self,
        pages: &dyn PageSource,
        scraped: &dyn ScrapedSource,
        progress: Option<&mut dyn FnMut(f64)>,
        log: &dyn LogSink,
    ) -> Result<HistoryOutcome> {
        let resolver = LocationResolver::with_threshold(self.locations, self.fuzzy_threshold);

        // 1. Source A
        let page_list = pages
            .load_pages()
            .map_err(|e| HistoryError::unavailable(Source::Document, format!("{}: {:#}", pages.describe(), e)))?;
        if page_list.is_empty() {
            log.error(&format!("{} has no pages", pages.describe()));
            return Err(HistoryError::EmptyDocument);
        }
        log.info(&format!("Processing {} pages from {}", page_list.len(), pages.describe()));

        let (document, segmentation) =
            segment_pages(&page_list, &resolver, self.cutoff.month_start(), progress, log);

        // 2. Source B
        let rows = scraped
            .load_rows()
            .map_err(|e| HistoryError::unavailable(Source::Scraped, format!("{}: {:#}", scraped.describe(), e)))?;
        let scraped_records = scraped_rows_to_records(&rows, &resolver, log);

        // 3. Merge
        let engine = ReconciliationEngine::new(self.cutoff).with_gap_years(self.fill_gap_years);
        let report = engine.reconcile(&document, &scraped_records, log);

        Ok(HistoryOutcome { report, segmentation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use crate::parser::Page;
    use crate::sources::ScrapedRow;
    use anyhow::anyhow;
    use chrono::NaiveDate;

    struct BrokenScraper;

    impl ScrapedSource for BrokenScraper {
        fn load_rows(&self) -> anyhow::Result<Vec<ScrapedRow>> {
            Err(anyhow!("browser session lost"))
        }
    }

    fn cutoff() -> Cutoff {
        Cutoff::new(NaiveDate::from_ymd_opt(2014, 5, 1).unwrap())
    }

    fn page_with(date_str: &str, code_cell: &str) -> Page {
        Page::new(
            format!("Página 1 de 1\nData Consulta CPF Nome Vínculo\n{} 1 MARIA 1", date_str),
            vec![vec![
                vec![Some("Função".to_string()), Some("Lotação".to_string())],
                vec![Some(code_cell.to_string()), Some("UNIDADE X".to_string())],
            ]],
        )
    }

    #[test]
    fn test_scraper_failure_is_not_replaced_by_empty_source() {
        let catalog = LocationCatalog::new();
        let builder = HistoryBuilder::new(&catalog, cutoff());
        let pages = vec![page_with("10/05/2014", "044 - X")];

        let err = builder.build(&pages, &BrokenScraper, None, &MemorySink::new()).unwrap_err();
        match err {
            HistoryError::SourceUnavailable { source_tag, reason } => {
                assert_eq!(source_tag, Source::Scraped);
                assert!(reason.contains("browser session lost"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_empty_document_is_an_error() {
        let catalog = LocationCatalog::new();
        let builder = HistoryBuilder::new(&catalog, cutoff());
        let err = builder
            .build(&Vec::<Page>::new(), &Vec::<ScrapedRow>::new(), None, &MemorySink::new())
            .unwrap_err();
        assert!(matches!(err, HistoryError::EmptyDocument));
    }

    #[test]
    fn test_build_merges_both_sources() {
        let catalog = LocationCatalog::new();
        let builder = HistoryBuilder::new(&catalog, cutoff()).with_gap_years(true);
        let pages = vec![page_with("10/05/2014", "044 - X"), page_with("03/03/2016", "141 - DUPLA")];
        let rows = vec![
            ScrapedRow::new("10/04/2014", "044", "UNIDADE X"),
            ScrapedRow::new("01/02/2012", "001", "UNIDADE X"),
            // Authority for 2016 is the document
            ScrapedRow::new("01/02/2016", "001", "UNIDADE X"),
        ];

        let mut calls = 0;
        let mut progress = |_: f64| calls += 1;
        let outcome = builder
            .build(&pages, &rows, Some(&mut progress), &MemorySink::new())
            .unwrap();
        let history = &outcome.report.history;

        assert_eq!(calls, 2);
        assert_eq!(history.years().collect::<Vec<_>>(), vec![2012, 2013, 2014, 2015, 2016]);
        assert_eq!(history.year(2013).unwrap().len(), 0);
        // April (B) and May (A) share the key; April wins
        let y2014 = history.year(2014).unwrap();
        assert_eq!(y2014.len(), 1);
        assert_eq!(y2014[0].source(), Source::Scraped);
        let y2016 = history.year(2016).unwrap();
        assert_eq!(y2016.len(), 1);
        assert_eq!(y2016[0].function_code().as_str(), "141");
        assert_eq!(outcome.segmentation.reports_started, 2);
    }
}
