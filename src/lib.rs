// Funções MDL - Core Library
// Rebuilds a person's yearly history of function assignments from a
// multi-report document and a scraped dataset. Used by the CLI and tests.

pub mod error;
pub mod logging;
pub mod record;
pub mod catalog;
pub mod resolver;
pub mod parser;         // Row Extractor + page/table model
pub mod segmenter;      // Report boundaries state machine
pub mod temporal;       // Cutoff policy
pub mod deduplication;
pub mod reconciliation;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod export;
pub mod config;

// Re-export commonly used types
pub use error::{HistoryError, Result};
pub use logging::{init_logging, LogSink, MemorySink, TracingSink};
pub use record::{parse_record_date, FunctionCode, Record, RecordKey, RecordsByYear, Source, YearlyRecordSet};
pub use catalog::{FunctionCatalog, FunctionInfo, LocationCatalog, LocationEntry};
pub use resolver::{LocationResolver, Resolution, DEFAULT_FUZZY_THRESHOLD};
pub use parser::{extract_code, Cell, CodeRule, Entry, Page, RawTable, RowExtractor};
pub use segmenter::{
    detect_report_start, segment_pages, PageOutcome, ReportSegmenter, SegmenterState, SegmenterStats,
    UNKNOWN_LOCATION,
};
pub use temporal::{Cutoff, YearPolicy};
pub use deduplication::{DeduplicationEngine, DeduplicationOutcome, DuplicateMatch};
pub use reconciliation::{ReconciliationEngine, ReconciliationReport, YearSummary};
pub use pipeline::{HistoryBuilder, HistoryOutcome};
pub use sources::{scraped_rows_to_records, CsvScrapedSource, JsonPageSource, PageSource, ScrapedRow, ScrapedSource};
pub use store::{load_function_catalog, load_location_catalog, open_reference_store, setup_reference_schema};
pub use export::{render_history, write_history};
pub use config::{Config, DEFAULT_CONFIG_FILE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
