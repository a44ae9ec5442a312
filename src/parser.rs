// 🏗️ Row Extractor - (function code, location) pairs out of messy tables
//
// The document collaborator hands us, per page, plain text plus a list of
// row-major tables whose cells may be missing. Every cell read goes
// through `cell_text`, which has an explicit "absent" branch.

use crate::logging::LogSink;
use crate::record::FunctionCode;
use crate::resolver::{collapse_newlines, LocationResolver};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// CORE TYPES
// ============================================================================

/// One table cell; `None` when the extractor found nothing there
pub type Cell = Option<String>;

/// Row-major table. Row 0 may be a header.
pub type RawTable = Vec<Vec<Cell>>;

/// One document page as delivered by the extraction primitive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub tables: Vec<RawTable>,
}

impl Page {
    pub fn new(text: impl Into<String>, tables: Vec<RawTable>) -> Self {
        Page {
            text: Some(text.into()),
            tables,
        }
    }
}

/// (code, resolved location) pair pending a report date
pub type Entry = (FunctionCode, String);

/// Non-empty trimmed text at `idx`, or `None` for short rows and blank cells
pub fn cell_text(row: &[Cell], idx: usize) -> Option<&str> {
    match row.get(idx) {
        Some(Some(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Some(None) | None => None,
    }
}

// ============================================================================
// CODE RULES (explicit precedence)
// ============================================================================

static LEADING_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{3})\s*-").expect("valid regex"));

static COD_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(\s*c[óo]d\.?\s*(\d{3})\s*\)").expect("valid regex"));

static BARE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3}$").expect("valid regex"));

/// Ways a function cell can carry its code, highest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRule {
    /// "044 - ATENDIMENTO"
    LeadingDash,

    /// "ATENDIMENTO (Cod. 044)"
    CodParenthesized,

    /// "044" alone on the first line
    BareDigits,
}

pub const CODE_RULES: [CodeRule; 3] = [CodeRule::LeadingDash, CodeRule::CodParenthesized, CodeRule::BareDigits];

impl CodeRule {
    pub fn apply(&self, cell: &str) -> Option<FunctionCode> {
        match self {
            CodeRule::LeadingDash => capture_code(&LEADING_DASH, cell),
            CodeRule::CodParenthesized => capture_code(&COD_PAREN, cell),
            CodeRule::BareDigits => {
                let first_line = cell.lines().next().unwrap_or("").trim();
                if BARE_CODE.is_match(first_line) {
                    FunctionCode::normalize(first_line)
                } else {
                    None
                }
            }
        }
    }
}

fn capture_code(re: &Regex, cell: &str) -> Option<FunctionCode> {
    re.captures(cell)
        .and_then(|caps| caps.get(1))
        .and_then(|m| FunctionCode::normalize(m.as_str()))
}

/// First rule that matches wins
pub fn extract_code(cell: &str) -> Option<FunctionCode> {
    CODE_RULES.iter().find_map(|rule| rule.apply(cell))
}

// ============================================================================
// ROW EXTRACTOR
// ============================================================================

pub const FUNCTION_MARKERS: &[&str] = &["Função", "Funcao"];
pub const LOCATION_MARKERS: &[&str] = &["Lotação", "Lotacao"];

/// Index of the first header cell containing any marker (case-insensitive)
pub fn find_column(header: &[Cell], markers: &[&str]) -> Option<usize> {
    let markers: Vec<String> = markers.iter().map(|m| m.to_lowercase()).collect();
    (0..header.len()).find(|&idx| {
        cell_text(header, idx)
            .map(|text| collapse_newlines(text).to_lowercase())
            .map_or(false, |text| markers.iter().any(|m| text.contains(m.as_str())))
    })
}

pub struct RowExtractor<'a> {
    resolver: &'a LocationResolver<'a>,
}

impl<'a> RowExtractor<'a> {
    pub fn new(resolver: &'a LocationResolver<'a>) -> Self {
        RowExtractor { resolver }
    }

    /// All (code, location) pairs on one page; duplicates within the page
    /// collapse
    pub fn extract(&self, tables: &[RawTable], default_location: &str, log: &dyn LogSink) -> BTreeSet<Entry> {
        let mut entries = BTreeSet::new();

        for (table_num, table) in tables.iter().enumerate() {
            let header = match table.first() {
                Some(header) => header,
                None => continue,
            };

            let function_col = find_column(header, FUNCTION_MARKERS);
            let location_col = find_column(header, LOCATION_MARKERS);

            let found = match function_col {
                Some(col) => self.extract_by_header(table, col, location_col, default_location, &mut entries),
                None => self.extract_by_scan(table, location_col, default_location, &mut entries),
            };

            if found == 0 {
                log.debug(&format!("Table {}: no function codes recognized", table_num + 1));
            }
        }

        entries
    }

    fn extract_by_header(
        &self,
        table: &RawTable,
        function_col: usize,
        location_col: Option<usize>,
        default_location: &str,
        entries: &mut BTreeSet<Entry>,
    ) -> usize {
        let mut found = 0;
        for row in table.iter().skip(1) {
            let code = match cell_text(row, function_col).and_then(extract_code) {
                Some(code) => code,
                None => continue,
            };
            let location = self.row_location(row, location_col, default_location);
            entries.insert((code, location));
            found += 1;
        }
        found
    }

    /// Recovery path for tables without a recognizable header
    fn extract_by_scan(
        &self,
        table: &RawTable,
        location_col: Option<usize>,
        default_location: &str,
        entries: &mut BTreeSet<Entry>,
    ) -> usize {
        let mut found = 0;
        for row in table {
            for idx in 0..row.len() {
                if Some(idx) == location_col {
                    continue;
                }
                let code = match cell_text(row, idx).and_then(|text| CodeRule::LeadingDash.apply(text)) {
                    Some(code) => code,
                    None => continue,
                };
                let location = self.row_location(row, location_col, default_location);
                entries.insert((code, location));
                found += 1;
            }
        }
        found
    }

    fn row_location(&self, row: &[Cell], location_col: Option<usize>, default_location: &str) -> String {
        match location_col.and_then(|col| cell_text(row, col)) {
            Some(text) => self.resolve_location_cell(text),
            None => default_location.to_string(),
        }
    }

    /// Leading token as a catalog identifier first, then the full resolver
    /// on the newline-collapsed text
    fn resolve_location_cell(&self, text: &str) -> String {
        let text = collapse_newlines(text);
        self.resolver
            .resolve_identifier(&text)
            .unwrap_or_else(|| self.resolver.resolve(&text))
    }

    /// Default location of a report: first location cell of the first table
    /// that has a location column and at least one data row
    pub fn recover_default_location(&self, tables: &[RawTable]) -> Option<String> {
        tables.iter().find_map(|table| {
            let header = table.first()?;
            let col = find_column(header, LOCATION_MARKERS)?;
            table
                .iter()
                .skip(1)
                .find_map(|row| cell_text(row, col))
                .map(|text| self.resolve_location_cell(text))
        })
    }
}
