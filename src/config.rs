// ⚙️ Configuration - TOML file, every field optional
//
// [reconciliation]
// cutoff = "2014-05-01"
// fill_gap_years = true
//
// [resolver]
// fuzzy_threshold = 0.85
//
// [inputs]
// pages = "pages.json"
// scraped = "scraped.csv"
// reference_db = "reference.db"
// function_list = "funcoes.txt"
//
// [output]
// path = "resultado.txt"
//
// [logging]
// filter = "info"

use crate::error::{HistoryError, Result};
use crate::resolver::DEFAULT_FUZZY_THRESHOLD;
use crate::temporal::Cutoff;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "funcoes.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reconciliation: ReconciliationConfig,
    pub resolver: ResolverConfig,
    pub inputs: InputsConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Business rule: before this month the scraped source is authoritative
    pub cutoff: NaiveDate,
    pub fill_gap_years: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        ReconciliationConfig {
            cutoff: Cutoff::default().date(),
            fill_gap_years: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub fuzzy_threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub pages: Option<PathBuf>,
    pub scraped: Option<PathBuf>,
    pub reference_db: Option<PathBuf>,
    pub function_list: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| HistoryError::Config(format!("Failed to read config file '{}': {}", path.display(), e)))?;
        Config::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let t = self.resolver.fuzzy_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(HistoryError::Config(format!(
                "resolver.fuzzy_threshold must be in (0, 1], got {}",
                t
            )));
        }
        Ok(())
    }

    pub fn cutoff(&self) -> Cutoff {
        Cutoff::new(self.reconciliation.cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cutoff(), Cutoff::default());
        assert!(config.reconciliation.fill_gap_years);
        assert!((config.resolver.fuzzy_threshold - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml_str(
            r#"
            [reconciliation]
            cutoff = "2015-03-01"

            [inputs]
            pages = "dump.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.reconciliation.cutoff, NaiveDate::from_ymd_opt(2015, 3, 1).unwrap());
        assert!(config.reconciliation.fill_gap_years);
        assert_eq!(config.inputs.pages, Some(PathBuf::from("dump.json")));
        assert!(config.inputs.scraped.is_none());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = Config::from_toml_str("[resolver]\nfuzzy_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, HistoryError::Config(_)));
    }

    #[test]
    fn test_bad_toml_is_toml_error() {
        let err = Config::from_toml_str("[reconciliation\n").unwrap_err();
        assert!(matches!(err, HistoryError::Toml(_)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Path::new("/no/such/funcoes.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
