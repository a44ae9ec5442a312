// ⚠️ Error Types - What can go wrong at the edges
// Heuristic misses never land here; they are absorbed locally and logged.
// Only collaborator failures and bad configuration surface to the caller.

use crate::record::Source;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    /// A collaborator could not deliver its input at all
    #[error("source {source_tag} unavailable: {reason}")]
    SourceUnavailable { source_tag: Source, reason: String },

    /// The document collaborator returned zero pages
    #[error("document has no pages")]
    EmptyDocument,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl HistoryError {
    /// Wrap any collaborator failure as a hard failure of the given source
    pub fn unavailable(source_tag: Source, reason: impl std::fmt::Display) -> Self {
        HistoryError::SourceUnavailable {
            source_tag,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_names_the_source() {
        let err = HistoryError::unavailable(Source::Scraped, "timeout");
        assert_eq!(err.to_string(), "source B unavailable: timeout");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: HistoryError = io.into();
        assert!(matches!(err, HistoryError::Io(_)));
        assert!(err.to_string().contains("missing.json"));
    }
}
