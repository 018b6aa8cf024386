//! Schema check and migration for databases created by older versions

use super::schema::{self, TABLES};
use crate::Result;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

/// One change needed to bring a database to the current schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationStep {
    MissingTable { table: String },
    MissingColumns { table: String, columns: Vec<String> },
    FtsRebuild { table: String, missing: Vec<String> },
}

impl std::fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationStep::MissingTable { table } => write!(f, "create table {}", table),
            MigrationStep::MissingColumns { table, columns } => {
                write!(f, "alter table {}: add {}", table, columns.join(", "))
            }
            MigrationStep::FtsRebuild { table, missing } => {
                write!(f, "rebuild FTS table {} (missing {})", table, missing.join(", "))
            }
        }
    }
}

/// Compare the live schema with the expected one
pub fn check_schema(conn: &Connection) -> Result<Vec<MigrationStep>> {
    let mut steps = Vec::new();

    for (table, create_sql) in TABLES {
        // fts5vocab columns are fixed by SQLite
        if create_sql.contains("fts5vocab(") {
            if table_sql(conn, table)?.is_none() {
                steps.push(MigrationStep::MissingTable { table: table.to_string() });
            }
            continue;
        }

        let Some(live_sql) = table_sql(conn, table)? else {
            steps.push(MigrationStep::MissingTable { table: table.to_string() });
            continue;
        };

        let is_fts = live_sql.to_uppercase().contains("VIRTUAL TABLE");
        let live = if is_fts {
            schema::columns_from_sql(&live_sql)
        } else {
            pragma_columns(conn, table)?
        };

        let missing: Vec<String> = schema::columns_from_sql(create_sql)
            .into_iter()
            .filter(|c| !live.contains(c))
            .collect();

        if missing.is_empty() {
            continue;
        }
        if is_fts {
            steps.push(MigrationStep::FtsRebuild { table: table.to_string(), missing });
        } else {
            steps.push(MigrationStep::MissingColumns { table: table.to_string(), columns: missing });
        }
    }

    Ok(steps)
}

/// Apply migration steps inside a single transaction
pub fn apply(conn: &Connection, steps: &[MigrationStep]) -> Result<()> {
    conn.execute_batch("BEGIN TRANSACTION")?;
    match apply_steps(conn, steps) {
        Ok(()) => {
            conn.execute_batch("COMMIT")?;
            Ok(())
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK").ok();
            Err(e)
        }
    }
}

fn apply_steps(conn: &Connection, steps: &[MigrationStep]) -> Result<()> {
    // Vocab tables reference the FTS table, so rebuilds go first
    let mut ordered: Vec<&MigrationStep> = steps.iter().collect();
    ordered.sort_by_key(|s| match s {
        MigrationStep::FtsRebuild { .. } => 0,
        MigrationStep::MissingColumns { .. } => 1,
        MigrationStep::MissingTable { .. } => 2,
    });

    for step in ordered {
        tracing::info!("Migrating: {}", step);
        match step {
            MigrationStep::MissingTable { table } => {
                if let Some(sql) = create_sql_for(table) {
                    conn.execute(sql, [])?;
                }
            }
            MigrationStep::MissingColumns { table, columns } => {
                for column in columns {
                    conn.execute(&format!("ALTER TABLE {} ADD COLUMN {}", table, column), [])?;
                }
            }
            MigrationStep::FtsRebuild { table, .. } => rebuild_fts(conn, table)?,
        }
    }

    for stmt in schema::CREATE_INDEXES {
        conn.execute(stmt, [])?;
    }
    Ok(())
}

/// Copy an FTS table into a fresh one with the current column set
fn rebuild_fts(conn: &Connection, table: &str) -> Result<()> {
    let Some(create) = create_sql_for(table) else {
        return Ok(());
    };
    let live_sql = table_sql(conn, table)?.unwrap_or_default();
    let old_columns = schema::columns_from_sql(&live_sql);
    let new_columns = schema::columns_from_sql(create);
    let shared: Vec<&String> = new_columns.iter().filter(|c| old_columns.contains(c)).collect();

    for (name, sql) in TABLES {
        if sql.contains(&format!("fts5vocab({}", table)) {
            conn.execute(&format!("DROP TABLE IF EXISTS {}", name), [])?;
        }
    }

    let backup = format!("{}_old", table);
    conn.execute(&format!("ALTER TABLE {} RENAME TO {}", table, backup), [])?;
    conn.execute(create, [])?;

    if !shared.is_empty() {
        let cols = shared.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ");
        conn.execute(
            &format!("INSERT INTO {} ({cols}) SELECT {cols} FROM {}", table, backup),
            [],
        )?;
    }
    conn.execute(&format!("DROP TABLE {}", backup), [])?;

    for (_, sql) in TABLES {
        if sql.contains(&format!("fts5vocab({}", table)) {
            conn.execute(sql, [])?;
        }
    }
    Ok(())
}

fn create_sql_for(table: &str) -> Option<&'static str> {
    TABLES.iter().find(|(name, _)| *name == table).map(|(_, sql)| *sql)
}

fn table_sql(conn: &Connection, table: &str) -> Result<Option<String>> {
    let sql = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(sql.flatten())
}

fn pragma_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let cols = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cols.into_iter().map(|c| c.to_lowercase()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::IndexStore;

    fn legacy_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE VIRTUAL TABLE file_index USING fts5(path, content, modified UNINDEXED, hash UNINDEXED, tag, tokenize='porter');
            CREATE TABLE file_metadata (path TEXT PRIMARY KEY, title TEXT, author TEXT);
            INSERT INTO file_index (path, content, modified, hash, tag) VALUES ('/a.txt', 'hello world', '2024-01-01T00:00:00', 'h1', '');
            INSERT INTO file_metadata (path, title) VALUES ('/a.txt', 'A');
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_fresh_schema_is_current() {
        let store = IndexStore::open_in_memory().unwrap();
        assert!(check_schema(store.connection()).unwrap().is_empty());
    }

    #[test]
    fn test_detects_legacy_gaps() {
        let conn = legacy_db();
        let steps = check_schema(&conn).unwrap();

        assert!(steps.contains(&MigrationStep::FtsRebuild {
            table: "file_index".to_string(),
            missing: vec!["clean_content".to_string()],
        }));
        assert!(steps.iter().any(|s| matches!(
            s,
            MigrationStep::MissingColumns { table, columns }
                if table == "file_metadata" && columns.contains(&"semantic_json".to_string())
        )));
        assert!(steps.contains(&MigrationStep::MissingTable { table: "search_cache".to_string() }));
        assert!(steps.contains(&MigrationStep::MissingTable { table: "cleaned_data".to_string() }));
    }

    #[test]
    fn test_apply_preserves_rows() {
        let conn = legacy_db();
        let steps = check_schema(&conn).unwrap();
        apply(&conn, &steps).unwrap();

        assert!(check_schema(&conn).unwrap().is_empty());
        let content: String = conn
            .query_row("SELECT content FROM file_index WHERE path = '/a.txt'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(content, "hello world");
        let title: String = conn
            .query_row("SELECT title FROM file_metadata WHERE path = '/a.txt'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(title, "A");
    }
}
