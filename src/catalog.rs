// 🏫 Reference Catalogs - Locations (lotações) and function descriptions
//
// Read-only after construction. The location catalog indexes each unit
// under every identifier it is known by (MDL and INEP codes), so a raw
// token from either system lands on the same entry.

use crate::logging::LogSink;
use crate::record::FunctionCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// LOCATION ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    /// Canonical (MDL) code, when the unit has one
    pub canonical_code: Option<String>,

    /// Secondary identifier (INEP)
    pub inep_code: Option<String>,

    /// Canonical payroll name
    pub canonical_name: String,

    /// "MDL - NAME" or just the name
    pub display: String,
}

impl LocationEntry {
    /// Build from a reference row; `None` when the name is blank
    pub fn from_reference(mdl: Option<&str>, inep: Option<&str>, name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let clean = |code: Option<&str>| {
            code.map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        };
        let canonical_code = clean(mdl);
        let inep_code = clean(inep);

        let display = match &canonical_code {
            Some(code) => format!("{} - {}", code, name),
            None => name.to_string(),
        };

        Some(LocationEntry {
            canonical_code,
            inep_code,
            canonical_name: name.to_string(),
            display,
        })
    }
}

// ============================================================================
// LOCATION CATALOG
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LocationCatalog {
    entries: Vec<LocationEntry>,
    by_code: HashMap<String, usize>,
}

impl LocationCatalog {
    pub fn new() -> Self {
        LocationCatalog::default()
    }

    /// Register an entry under each of its identifier codes. A code that is
    /// already taken keeps its first owner.
    pub fn insert(&mut self, entry: LocationEntry) {
        let idx = self.entries.len();
        let codes: Vec<String> = entry
            .canonical_code
            .iter()
            .chain(entry.inep_code.iter())
            .cloned()
            .collect();
        self.entries.push(entry);
        for code in codes {
            self.by_code.entry(code).or_insert(idx);
        }
    }

    pub fn get(&self, code: &str) -> Option<&LocationEntry> {
        self.by_code.get(code.trim()).map(|&idx| &self.entries[idx])
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.by_code.contains_key(code.trim())
    }

    /// Every distinct unit, in insertion order
    pub fn entries(&self) -> &[LocationEntry] {
        &self.entries
    }

    /// Number of identifier keys (a unit with MDL and INEP counts twice)
    pub fn key_count(&self) -> usize {
        self.by_code.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<LocationEntry> for LocationCatalog {
    fn from_iter<I: IntoIterator<Item = LocationEntry>>(iter: I) -> Self {
        let mut catalog = LocationCatalog::new();
        for entry in iter {
            catalog.insert(entry);
        }
        catalog
    }
}

// ============================================================================
// FUNCTION CATALOG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub description: String,
    pub classification: Option<String>,
}

/// Collapse every "Regência ..." classification into "Magistério"
pub fn simplify_classification(raw: Option<&str>) -> Option<String> {
    let raw = raw.map(str::trim).filter(|c| !c.is_empty())?;
    if raw.starts_with("Regência") {
        Some("Magistério".to_string())
    } else {
        Some(raw.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionCatalog {
    functions: BTreeMap<FunctionCode, FunctionInfo>,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        FunctionCatalog::default()
    }

    pub fn insert(&mut self, code: FunctionCode, info: FunctionInfo) {
        self.functions.insert(code, info);
    }

    pub fn get(&self, code: &FunctionCode) -> Option<&FunctionInfo> {
        self.functions.get(code)
    }

    /// Description for display, with the placeholder for unknown codes
    pub fn describe(&self, code: &FunctionCode) -> String {
        match self.functions.get(code) {
            Some(info) => info.description.clone(),
            None => format!("DESCRIÇÃO NÃO ENCONTRADA PARA {}", code),
        }
    }

    /// Consult a user-typed code: must be exactly 3 digits
    pub fn lookup(&self, raw: &str) -> Result<Option<&FunctionInfo>, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("Por favor, insira um código.".to_string());
        }
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err("Código inválido. Deve conter 3 dígitos.".to_string());
        }
        Ok(FunctionCode::normalize(trimmed).and_then(|code| self.functions.get(&code)))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Parse a plain-text list of "DDD - DESCRIPTION" lines
    pub fn parse_list(text: &str, log: &dyn LogSink) -> FunctionCatalog {
        let mut catalog = FunctionCatalog::new();

        for line in text.lines() {
            let line = line.replace('\u{a0}', " ").replace("&nbsp;", " ");
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parsed = line
                .split_once(" - ")
                .and_then(|(code, desc)| Some((FunctionCode::normalize(code)?, desc.trim())));

            match parsed {
                Some((code, desc)) if !desc.is_empty() => {
                    catalog.insert(
                        code,
                        FunctionInfo {
                            description: desc.to_string(),
                            classification: None,
                        },
                    );
                }
                _ => log.warn(&format!("Could not parse function list line: {}", line)),
            }
        }

        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    #[test]
    fn test_location_entry_display() {
        let with_code = LocationEntry::from_reference(Some(" 123 "), Some("52000001"), "UNIDADE X ").unwrap();
        assert_eq!(with_code.display, "123 - UNIDADE X");
        assert_eq!(with_code.canonical_code.as_deref(), Some("123"));

        let without_code = LocationEntry::from_reference(None, Some("52000002"), "UNIDADE Y").unwrap();
        assert_eq!(without_code.display, "UNIDADE Y");

        assert!(LocationEntry::from_reference(Some("9"), None, "   ").is_none());
    }

    #[test]
    fn test_catalog_indexes_both_codes() {
        let catalog: LocationCatalog = vec![
            LocationEntry::from_reference(Some("123"), Some("52000001"), "UNIDADE X").unwrap(),
            LocationEntry::from_reference(Some("456"), None, "UNIDADE Z").unwrap(),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.key_count(), 3);
        assert_eq!(catalog.get("52000001").unwrap().display, "123 - UNIDADE X");
        assert_eq!(catalog.get("123").unwrap().display, "123 - UNIDADE X");
        assert!(catalog.contains_code("456"));
        assert!(catalog.get("999").is_none());
    }

    #[test]
    fn test_simplify_classification() {
        assert_eq!(simplify_classification(Some("Regência de classe")), Some("Magistério".to_string()));
        assert_eq!(simplify_classification(Some("Administrativo")), Some("Administrativo".to_string()));
        assert_eq!(simplify_classification(Some("  ")), None);
        assert_eq!(simplify_classification(None), None);
    }

    #[test]
    fn test_parse_function_list() {
        let sink = MemorySink::new();
        let text = "146 - ACOMPANHAMENTO DE EGRESSOS\n\n044 - PROFESSOR DE ATENDIMENTO\u{a0}EDUCACIONAL\nsem separador\n";
        let catalog = FunctionCatalog::parse_list(text, &sink);

        assert_eq!(catalog.len(), 2);
        let code = FunctionCode::normalize("044").unwrap();
        assert_eq!(catalog.describe(&code), "PROFESSOR DE ATENDIMENTO EDUCACIONAL");
        assert!(sink.contains("sem separador"));
    }

    #[test]
    fn test_lookup_validation() {
        let mut catalog = FunctionCatalog::new();
        catalog.insert(
            FunctionCode::normalize("001").unwrap(),
            FunctionInfo { description: "GESTOR ESCOLAR".to_string(), classification: None },
        );

        assert_eq!(catalog.lookup("001").unwrap().unwrap().description, "GESTOR ESCOLAR");
        assert!(catalog.lookup("002").unwrap().is_none());
        assert!(catalog.lookup("1").is_err());
        assert!(catalog.lookup("").is_err());
    }

    #[test]
    fn test_describe_unknown_code() {
        let catalog = FunctionCatalog::new();
        let code = FunctionCode::normalize("717").unwrap();
        assert_eq!(catalog.describe(&code), "DESCRIÇÃO NÃO ENCONTRADA PARA 717");
    }
}
