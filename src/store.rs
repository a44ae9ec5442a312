// 🗄️ Reference Store - Catalogs out of SQLite
//
// Two tables:
//   unidades(mdl, inep, nome_folha)        → LocationCatalog
//   funcoes(id, descricao, classificacao)  → FunctionCatalog
//
// Codes may be stored as INTEGER or TEXT; both are read as text.

use crate::catalog::{simplify_classification, FunctionCatalog, FunctionInfo, LocationCatalog, LocationEntry};
use crate::error::{HistoryError, Result};
use crate::logging::LogSink;
use crate::record::FunctionCode;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Open an existing reference database without write access
pub fn open_reference_store(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(HistoryError::Catalog(format!(
            "reference database not found: {}",
            path.display()
        )));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    Ok(conn)
}

/// Create the reference tables (fixtures and first-time setup)
pub fn setup_reference_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS unidades (
            mdl TEXT,
            inep TEXT,
            nome_folha TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS funcoes (
            id INTEGER PRIMARY KEY,
            descricao TEXT NOT NULL,
            classificacao TEXT
        )",
        [],
    )?;

    Ok(())
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(format!("{}", f)),
        Value::Text(s) => Some(s),
        Value::Null | Value::Blob(_) => None,
    }
}

pub fn load_location_catalog(conn: &Connection, log: &dyn LogSink) -> Result<LocationCatalog> {
    let mut stmt = conn.prepare("SELECT mdl, inep, nome_folha FROM unidades")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                value_to_string(row.get::<_, Value>(0)?),
                value_to_string(row.get::<_, Value>(1)?),
                value_to_string(row.get::<_, Value>(2)?),
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut catalog = LocationCatalog::new();
    let mut skipped = 0;
    for (mdl, inep, name) in rows {
        let entry = name
            .as_deref()
            .and_then(|name| LocationEntry::from_reference(mdl.as_deref(), inep.as_deref(), name));
        match entry {
            Some(entry) => catalog.insert(entry),
            None => skipped += 1,
        }
    }

    log.info(&format!(
        "Loaded {} units ({} identifier keys, {} nameless rows skipped)",
        catalog.len(),
        catalog.key_count(),
        skipped
    ));
    Ok(catalog)
}

pub fn load_function_catalog(conn: &Connection, log: &dyn LogSink) -> Result<FunctionCatalog> {
    let mut stmt = conn.prepare("SELECT id, descricao, classificacao FROM funcoes")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                value_to_string(row.get::<_, Value>(0)?),
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut catalog = FunctionCatalog::new();
    for (id, description, classification) in rows {
        let code = match id.as_deref().and_then(FunctionCode::normalize) {
            Some(code) => code,
            None => {
                log.warn(&format!("Function id {:?} is not a 3-digit code; skipped", id));
                continue;
            }
        };
        catalog.insert(
            code,
            FunctionInfo {
                description: description.unwrap_or_default().trim().to_string(),
                classification: simplify_classification(classification.as_deref()),
            },
        );
    }

    log.info(&format!("Loaded {} functions", catalog.len()));
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use rusqlite::params;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_reference_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO unidades (mdl, inep, nome_folha) VALUES (?1, ?2, ?3)",
            params![123, "52000001", "E E JOAO DA SILVA "],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO unidades (mdl, inep, nome_folha) VALUES (?1, ?2, ?3)",
            params![Option::<String>::None, "52000002", "CEI PRIMAVERA"],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO unidades (mdl, inep, nome_folha) VALUES (?1, ?2, ?3)",
            params!["999", Option::<String>::None, Option::<String>::None],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO funcoes (id, descricao, classificacao) VALUES (?1, ?2, ?3)",
            params![44, "PROFESSOR DE ATENDIMENTO EDUCACIONAL ESPECIALIZADO", "Regência de classe"],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO funcoes (id, descricao, classificacao) VALUES (?1, ?2, ?3)",
            params![1, "GESTOR ESCOLAR", "Gestão"],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO funcoes (id, descricao, classificacao) VALUES (?1, ?2, ?3)",
            params![1001, "FORA DO PADRAO", Option::<String>::None],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_load_location_catalog() {
        let conn = seeded();
        let sink = MemorySink::new();
        let catalog = load_location_catalog(&conn, &sink).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("123").unwrap().display, "123 - E E JOAO DA SILVA");
        assert_eq!(catalog.get("52000001").unwrap().display, "123 - E E JOAO DA SILVA");
        assert_eq!(catalog.get("52000002").unwrap().display, "CEI PRIMAVERA");
        assert!(catalog.get("999").is_none());
        assert!(sink.contains("1 nameless rows skipped"));
    }

    #[test]
    fn test_load_function_catalog_pads_and_simplifies() {
        let conn = seeded();
        let sink = MemorySink::new();
        let catalog = load_function_catalog(&conn, &sink).unwrap();

        assert_eq!(catalog.len(), 2);
        let code = FunctionCode::normalize("044").unwrap();
        let info = catalog.get(&code).unwrap();
        assert_eq!(info.classification.as_deref(), Some("Magistério"));
        assert_eq!(catalog.describe(&FunctionCode::normalize("1").unwrap()), "GESTOR ESCOLAR");
        assert!(sink.contains("1001"));
    }

    #[test]
    fn test_open_missing_store_is_catalog_error() {
        let err = open_reference_store(Path::new("/no/such/reference.db")).unwrap_err();
        assert!(matches!(err, HistoryError::Catalog(_)));
    }

    #[test]
    fn test_open_existing_store_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.db");
        {
            let conn = Connection::open(&path).unwrap();
            setup_reference_schema(&conn).unwrap();
        }
        let conn = open_reference_store(&path).unwrap();
        let catalog = load_location_catalog(&conn, &MemorySink::new()).unwrap();
        assert!(catalog.is_empty());
    }
}
