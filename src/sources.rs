// 🔌 Collaborator Seams - Where pages and scraped rows come from
//
// The document text/table extraction and the browser automation live
// outside this crate. They reach the engine through two traits; the file
// adapters below read their dumps.

use crate::logging::LogSink;
use crate::parser::Page;
use crate::record::{parse_record_date, FunctionCode, Record, RecordsByYear, Source};
use crate::resolver::LocationResolver;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

// ============================================================================
// TRAITS
// ============================================================================

/// Source A collaborator: ordered pages of one document
pub trait PageSource: Send + Sync {
    fn load_pages(&self) -> Result<Vec<Page>>;

    /// Label for logs and errors
    fn describe(&self) -> String {
        "document".to_string()
    }
}

/// Source B collaborator: raw rows collected by the scraper
pub trait ScrapedSource: Send + Sync {
    fn load_rows(&self) -> Result<Vec<ScrapedRow>>;

    fn describe(&self) -> String {
        "scraped dataset".to_string()
    }
}

// ============================================================================
// SCRAPED ROW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedRow {
    pub date: String,
    pub function_code: String,
    pub location: String,
}

impl ScrapedRow {
    pub fn new(date: &str, function_code: &str, location: &str) -> Self {
        ScrapedRow {
            date: date.to_string(),
            function_code: function_code.to_string(),
            location: location.to_string(),
        }
    }
}

/// Turn raw scraped rows into source-B records. Bad dates and codes are
/// dropped with a warning; locations are resolved against the catalog so
/// keys line up with source A.
pub fn scraped_rows_to_records(rows: &[ScrapedRow], resolver: &LocationResolver<'_>, log: &dyn LogSink) -> RecordsByYear {
    let mut records = RecordsByYear::new();
    let mut dropped = 0;

    for (idx, row) in rows.iter().enumerate() {
        let date = match parse_record_date(&row.date) {
            Some(date) => date,
            None => {
                log.warn(&format!("Scraped row {}: unparsable date '{}'; dropped", idx + 1, row.date));
                dropped += 1;
                continue;
            }
        };
        let code = match FunctionCode::normalize(&row.function_code) {
            Some(code) => code,
            None => {
                log.warn(&format!(
                    "Scraped row {}: invalid function code '{}'; dropped",
                    idx + 1,
                    row.function_code
                ));
                dropped += 1;
                continue;
            }
        };
        let location = resolver.resolve(&row.location);
        records.insert(Record::new(date, code, location, Source::Scraped));
    }

    log.info(&format!(
        "Scraped source: {} rows, {} records, {} dropped",
        rows.len(),
        records.len(),
        dropped
    ));
    records
}

// ============================================================================
// FILE ADAPTERS
// ============================================================================

/// Reads a JSON dump: `[{"text": ..., "tables": [[[cell, ...], ...], ...]}, ...]`
pub struct JsonPageSource {
    path: PathBuf,
}

impl JsonPageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonPageSource { path: path.into() }
    }
}

impl PageSource for JsonPageSource {
    fn load_pages(&self) -> Result<Vec<Page>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open page dump: {}", self.path.display()))?;
        let pages: Vec<Page> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse page dump: {}", self.path.display()))?;
        Ok(pages)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Reads a CSV with headers `date,function_code,location`
pub struct CsvScrapedSource {
    path: PathBuf,
}

impl CsvScrapedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvScrapedSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScrapedSource for CsvScrapedSource {
    fn load_rows(&self) -> Result<Vec<ScrapedRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open scraped CSV: {}", self.path.display()))?;

        let mut rows = Vec::new();
        let mut skipped = 0;
        for (line_num, result) in reader.deserialize::<ScrapedRow>().enumerate() {
            match result {
                Ok(row) => rows.push(row),
                // A broken stream is the whole source; a broken record is one row
                Err(e) if e.is_io_error() => {
                    return Err(e).with_context(|| format!("Failed to read scraped CSV: {}", self.path.display()));
                }
                Err(e) => {
                    tracing::warn!("Skipping CSV line {} in {}: {}", line_num + 2, self.path.display(), e);
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            tracing::warn!("{}: {} malformed rows skipped", self.path.display(), skipped);
        }
        Ok(rows)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// In-memory sources, handy for embedding callers and tests
impl PageSource for Vec<Page> {
    fn load_pages(&self) -> Result<Vec<Page>> {
        Ok(self.clone())
    }
}

impl ScrapedSource for Vec<ScrapedRow> {
    fn load_rows(&self) -> Result<Vec<ScrapedRow>> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LocationCatalog, LocationEntry};
    use crate::logging::MemorySink;
    use std::io::Write;

    #[test]
    fn test_scraped_rows_to_records() {
        let catalog: LocationCatalog = vec![LocationEntry::from_reference(Some("123"), None, "UNIDADE X").unwrap()]
            .into_iter()
            .collect();
        let resolver = LocationResolver::new(&catalog);
        let sink = MemorySink::new();

        let rows = vec![
            ScrapedRow::new("10/04/2014", "44", "U.NIDADE X"),
            ScrapedRow::new("2013-02-01", "141", "123"),
            ScrapedRow::new("sem data", "001", "X"),
            ScrapedRow::new("01/01/2012", "ABC", "X"),
        ];
        let records = scraped_rows_to_records(&rows, &resolver, &sink);

        assert_eq!(records.len(), 2);
        let r2014 = &records.year(2014)[0];
        assert_eq!(r2014.function_code().as_str(), "044");
        assert_eq!(r2014.location(), "123 - UNIDADE X");
        assert_eq!(r2014.source(), Source::Scraped);
        assert_eq!(records.year(2013)[0].location(), "123 - UNIDADE X");
        assert_eq!(sink.messages_at(tracing::Level::WARN).len(), 2);
    }

    #[test]
    fn test_csv_scraped_source_reads_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,function_code,location").unwrap();
        writeln!(file, "10/04/2014, 044 ,UNIDADE X").unwrap();
        writeln!(file, "\"01/02/2013\",141,\"ESCOLA, ANEXO\"").unwrap();

        let rows = CsvScrapedSource::new(file.path()).load_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].function_code, "044");
        assert_eq!(rows[1].location, "ESCOLA, ANEXO");
    }

    #[test]
    fn test_csv_malformed_rows_are_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,function_code,location").unwrap();
        writeln!(file, "10/04/2014,044,UNIDADE X").unwrap();
        writeln!(file, "11/04/2014,141").unwrap();
        writeln!(file, "13/04/2014,001,UNIDADE Z").unwrap();

        let rows = CsvScrapedSource::new(file.path()).load_rows().unwrap();
        let codes: Vec<&str> = rows.iter().map(|r| r.function_code.as_str()).collect();
        assert_eq!(codes, vec!["044", "001"]);
        assert_eq!(rows[1].location, "UNIDADE Z");
    }

    #[test]
    fn test_csv_missing_file_errors() {
        let err = CsvScrapedSource::new("/no/such/scraped.csv").load_rows().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open scraped CSV"));
    }

    #[test]
    fn test_json_page_source_missing_file_errors() {
        let source = JsonPageSource::new("/definitely/not/here.json");
        let err = source.load_pages().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open page dump"));
    }

    #[test]
    fn test_json_page_source_reads_dump() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"text": "Página 1 de 1", "tables": []}}, {{"tables": [[["Função"]]]}}]"#).unwrap();

        let pages = JsonPageSource::new(file.path()).load_pages().unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[1].text.is_none());
        assert_eq!(pages[1].tables[0][0][0].as_deref(), Some("Função"));
    }
}
