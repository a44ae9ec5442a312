// 📍 Location Resolver - Raw location text → canonical display string
//
// Resolution order:
//   1. Identifier path: leading token is a catalog key → that entry
//   2. Exact pass: normalized text equals a normalized canonical name
//   3. Fuzzy pass: best normalized-Levenshtein ratio, accepted only above
//      the threshold
//   4. Fallback: the raw text, trimmed, unchanged
//
// Pure function of (text, catalog). O(catalog) per call.

use crate::catalog::{LocationCatalog, LocationEntry};
use strsim::normalized_levenshtein;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

// ============================================================================
// RESOLUTION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Leading token was a catalog identifier
    Identifier(String),

    /// Normalized name matched exactly
    ExactName(String),

    /// Fuzzy best match above the threshold
    Fuzzy { display: String, score: f64 },

    /// Nothing matched; trimmed raw text
    Unresolved(String),
}

impl Resolution {
    pub fn display(&self) -> &str {
        match self {
            Resolution::Identifier(d) | Resolution::ExactName(d) | Resolution::Unresolved(d) => d,
            Resolution::Fuzzy { display, .. } => display,
        }
    }

    pub fn into_display(self) -> String {
        match self {
            Resolution::Identifier(d) | Resolution::ExactName(d) | Resolution::Unresolved(d) => d,
            Resolution::Fuzzy { display, .. } => display,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unresolved(_))
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Uppercase, periods become spaces, whitespace runs collapse, trimmed
///
/// "E.E. Joao  da Silva" → "E E JOAO DA SILVA"
pub fn normalize_location_name(raw: &str) -> String {
    raw.to_uppercase()
        .replace('.', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse embedded newlines (multi-line table cells) into single spaces
pub fn collapse_newlines(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First whitespace-delimited token, stripped of a trailing dash
pub fn leading_token(raw: &str) -> Option<&str> {
    let token = raw.split_whitespace().next()?;
    let token = token.trim_end_matches('-');
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// The whole text is an identifier: a bare code ("123") or the catalog's
/// own display form ("123 - UNIDADE X"). Names that merely start with a
/// number ("25 DE DEZEMBRO") are not.
pub fn identifier_token(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if !trimmed.contains(char::is_whitespace) {
        return leading_token(trimmed);
    }
    let (code, _) = trimmed.split_once(" - ")?;
    let code = code.trim();
    if code.is_empty() || code.contains(char::is_whitespace) {
        None
    } else {
        Some(code)
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct LocationResolver<'a> {
    catalog: &'a LocationCatalog,
    fuzzy_threshold: f64,
    normalized_names: Vec<String>,
}

impl<'a> LocationResolver<'a> {
    pub fn new(catalog: &'a LocationCatalog) -> Self {
        Self::with_threshold(catalog, DEFAULT_FUZZY_THRESHOLD)
    }

    pub fn with_threshold(catalog: &'a LocationCatalog, fuzzy_threshold: f64) -> Self {
        let normalized_names = catalog
            .entries()
            .iter()
            .map(|e| normalize_location_name(&e.canonical_name))
            .collect();
        LocationResolver {
            catalog,
            fuzzy_threshold,
            normalized_names,
        }
    }

    pub fn catalog(&self) -> &LocationCatalog {
        self.catalog
    }

    /// Full resolution; the caller gets the display string either way
    pub fn resolve(&self, raw: &str) -> String {
        self.resolve_detailed(raw).into_display()
    }

    pub fn resolve_detailed(&self, raw: &str) -> Resolution {
        let raw = raw.trim();

        if let Some(entry) = identifier_token(raw).and_then(|token| self.catalog.get(token)) {
            return Resolution::Identifier(entry.display.clone());
        }

        let normalized = normalize_location_name(raw);
        if normalized.is_empty() {
            return Resolution::Unresolved(raw.to_string());
        }

        if let Some(entry) = self.exact_match(&normalized) {
            return Resolution::ExactName(entry.display.clone());
        }

        match self.best_fuzzy_match(&normalized) {
            Some((entry, score)) if score > self.fuzzy_threshold => Resolution::Fuzzy {
                display: entry.display.clone(),
                score,
            },
            _ => Resolution::Unresolved(raw.to_string()),
        }
    }

    /// Table-cell path: the leading token of a location cell is a catalog
    /// key, whatever follows it
    pub fn resolve_identifier(&self, raw: &str) -> Option<String> {
        let token = leading_token(raw)?;
        self.catalog.get(token).map(|e| e.display.clone())
    }

    fn exact_match(&self, normalized: &str) -> Option<&LocationEntry> {
        self.normalized_names
            .iter()
            .position(|name| name == normalized)
            .map(|idx| &self.catalog.entries()[idx])
    }

    /// Highest-scoring entry; the first one wins on ties
    fn best_fuzzy_match(&self, normalized: &str) -> Option<(&LocationEntry, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, name) in self.normalized_names.iter().enumerate() {
            let score = normalized_levenshtein(normalized, name);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((idx, score));
            }
        }
        best.map(|(idx, score)| (&self.catalog.entries()[idx], score))
    }
}
