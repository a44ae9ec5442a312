// 📝 Export - Plain-text rendering of the reconciled history
//
// Ano: 2014
// Funções:
//   044 - PROFESSOR | 123 - UNIDADE X | 10/04/2014
//
// Ano: 2015
// Funções:
//   -

use crate::catalog::FunctionCatalog;
use crate::error::Result;
use crate::record::YearlyRecordSet;
use std::fs;
use std::path::Path;

/// One `Ano:` block per year, blocks separated by a blank line. Unknown
/// codes get the catalog's placeholder description.
pub fn render_history(history: &YearlyRecordSet, functions: &FunctionCatalog) -> String {
    let blocks: Vec<String> = history
        .iter()
        .map(|(year, records)| {
            let mut block = format!("Ano: {}\nFunções:\n", year);
            if records.is_empty() {
                block.push_str("  -\n");
            }
            for record in records {
                block.push_str(&format!(
                    "  {} - {} | {} | {}\n",
                    record.function_code(),
                    functions.describe(record.function_code()),
                    record.location(),
                    record.date().format("%d/%m/%Y")
                ));
            }
            block
        })
        .collect();

    blocks.join("\n")
}

/// Write `text` to `path`, creating missing parent directories
pub fn write_history(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FunctionInfo;
    use crate::record::{FunctionCode, Record, Source};
    use chrono::NaiveDate;

    fn create_test_history() -> YearlyRecordSet {
        let code = |c: &str| FunctionCode::normalize(c).unwrap();
        let mut history = YearlyRecordSet::new();
        history.set_year(
            2014,
            vec![
                Record::new(NaiveDate::from_ymd_opt(2014, 4, 10).unwrap(), code("44"), "123 - UNIDADE X", Source::Scraped),
                Record::new(NaiveDate::from_ymd_opt(2014, 6, 1).unwrap(), code("141"), "UNIDADE Y", Source::Document),
            ],
        );
        history.set_year(2015, Vec::new());
        history
    }

    #[test]
    fn test_render_history_layout() {
        let mut functions = FunctionCatalog::new();
        functions.insert(
            FunctionCode::normalize("044").unwrap(),
            FunctionInfo {
                description: "PROFESSOR".to_string(),
                classification: Some("Magistério".to_string()),
            },
        );

        let text = render_history(&create_test_history(), &functions);
        let expected = "Ano: 2014\n\
                        Funções:\n  \
                        044 - PROFESSOR | 123 - UNIDADE X | 10/04/2014\n  \
                        141 - DESCRIÇÃO NÃO ENCONTRADA PARA 141 | UNIDADE Y | 01/06/2014\n\
                        \n\
                        Ano: 2015\n\
                        Funções:\n  \
                        -\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_empty_history() {
        assert_eq!(render_history(&YearlyRecordSet::new(), &FunctionCatalog::new()), "");
    }

    #[test]
    fn test_write_history_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("resultado.txt");
        write_history(&path, "Ano: 2014\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Ano: 2014\n");
    }
}
