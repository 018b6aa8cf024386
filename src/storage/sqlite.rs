//! SQLite storage implementation

use super::schema;
use crate::{Error, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// SQLite-backed storage for the full-text index
pub struct IndexStore {
    conn: Connection,
    path: Option<PathBuf>,
}

/// A file ready to be written into `file_index`
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    pub clean_content: String,
    pub modified: String,
    pub hash: String,
}

/// Row of `file_metadata`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct FileMetadata {
    pub path: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub created: Option<String>,
    pub last_modified: Option<String>,
    pub last_modified_by: Option<String>,
    pub alias: Option<String>,
    pub format: Option<String>,
    pub size: Option<i64>,
    pub semantic_json: Option<String>,
}

/// Raw row returned by the FTS and regex queries
#[derive(Debug, Clone)]
pub struct IndexedRow {
    pub path: String,
    pub content: String,
    pub modified: String,
    pub tag: String,
    pub title: Option<String>,
    pub rank: f64,
}

/// Row of `search_cache`
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub term: String,
    pub request_json: String,
    pub results_json: String,
    pub generation: i64,
    pub created_at: i64,
    pub hits: i64,
}

/// Row of `search_profiles`
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub name: String,
    pub term: String,
    pub options_json: String,
    pub results_json: String,
    pub saved_at: String,
}

/// Row of `cleaned_data`
#[derive(Debug, Clone)]
pub struct CleanedRecord {
    pub path: String,
    pub cleaned_at: String,
    pub row_count: usize,
    pub col_count: usize,
    pub data_json: String,
}

/// Extra SQL conditions appended to a search query
#[derive(Debug, Default, Clone)]
pub struct SqlFilter {
    pub clauses: Vec<String>,
    pub params: Vec<Value>,
}

impl SqlFilter {
    pub fn push(&mut self, clause: impl Into<String>, value: impl Into<Value>) {
        self.clauses.push(clause.into());
        self.params.push(value.into());
    }

    fn render(&self) -> String {
        self.clauses
            .iter()
            .map(|c| format!(" AND ({})", c))
            .collect::<String>()
    }
}

impl IndexStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Opened {} (journal_mode={})", path.display(), mode);
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, path: None };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        register_functions(&self.conn)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Raw connection, for schema inspection and migrations
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ========== File Operations ==========

    /// Insert or replace an indexed file. FTS5 has no upsert, so the old row
    /// is deleted first. Existing tags are carried into the `tag` column.
    pub fn upsert_file(&self, record: &FileRecord, metadata: &FileMetadata) -> Result<()> {
        let tags = self.get_tags(&record.path)?.join(",");

        self.conn
            .execute("DELETE FROM file_index WHERE path = ?1", [&record.path])?;
        self.conn.execute(
            r#"
            INSERT INTO file_index (path, content, clean_content, modified, hash, tag)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.path,
                record.content,
                record.clean_content,
                record.modified,
                record.hash,
                tags,
            ],
        )?;

        // Alias survives re-indexing
        self.conn.execute(
            r#"
            INSERT INTO file_metadata (path, title, author, subject, created, last_modified,
                                       last_modified_by, alias, format, size, semantic_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(path) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                subject = excluded.subject,
                created = excluded.created,
                last_modified = excluded.last_modified,
                last_modified_by = excluded.last_modified_by,
                alias = COALESCE(excluded.alias, file_metadata.alias),
                format = excluded.format,
                size = excluded.size,
                semantic_json = excluded.semantic_json
            "#,
            params![
                record.path,
                metadata.title,
                metadata.author,
                metadata.subject,
                metadata.created,
                metadata.last_modified,
                metadata.last_modified_by,
                metadata.alias,
                metadata.format,
                metadata.size,
                metadata.semantic_json,
            ],
        )?;
        Ok(())
    }

    /// Stored content hash of a file
    pub fn get_file_hash(&self, path: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT hash FROM file_index WHERE path = ?1",
                [path],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Map of path -> hash for every indexed file below `root`
    pub fn hashes_under(&self, root: &str) -> Result<HashMap<String, String>> {
        let prefix = dir_prefix(root);
        let mut stmt = self.conn.prepare(
            "SELECT path, hash FROM file_index WHERE substr(path, 1, ?1) = ?2",
        )?;

        let rows = stmt
            .query_map(params![prefix.chars().count() as i64, prefix], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<_>>()?;

        Ok(rows)
    }

    /// Fetch the indexed text of a file
    pub fn get_content(&self, path: &str) -> Result<Option<(String, String)>> {
        self.conn
            .query_row(
                "SELECT content, clean_content FROM file_index WHERE path = ?1",
                [path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_metadata(&self, path: &str) -> Result<Option<FileMetadata>> {
        self.conn
            .query_row(
                r#"
                SELECT path, title, author, subject, created, last_modified, last_modified_by,
                       alias, format, size, semantic_json
                FROM file_metadata WHERE path = ?1
                "#,
                [path],
                |row| {
                    Ok(FileMetadata {
                        path: row.get(0)?,
                        title: row.get(1)?,
                        author: row.get(2)?,
                        subject: row.get(3)?,
                        created: row.get(4)?,
                        last_modified: row.get(5)?,
                        last_modified_by: row.get(6)?,
                        alias: row.get(7)?,
                        format: row.get(8)?,
                        size: row.get(9)?,
                        semantic_json: row.get(10)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Remove a file from every table
    pub fn delete_file(&self, path: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM file_index WHERE path = ?1", [path])?;
        self.conn
            .execute("DELETE FROM file_metadata WHERE path = ?1", [path])?;
        self.conn.execute("DELETE FROM file_tags WHERE path = ?1", [path])?;
        Ok(removed > 0)
    }

    /// Move a file's rows to a new path, remembering the old file name as alias
    pub fn rename_path(&self, old_path: &str, new_path: &str) -> Result<()> {
        let old_name = old_path.rsplit('/').next().unwrap_or(old_path);

        self.conn.execute(
            "UPDATE file_index SET path = ?1 WHERE path = ?2",
            params![new_path, old_path],
        )?;
        self.conn.execute(
            "UPDATE file_metadata SET path = ?1, alias = ?2 WHERE path = ?3",
            params![new_path, old_name, old_path],
        )?;
        self.conn.execute(
            "UPDATE file_tags SET path = ?1 WHERE path = ?2",
            params![new_path, old_path],
        )?;
        Ok(())
    }

    pub fn count_files(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_index", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Search Queries ==========

    /// Run an FTS5 MATCH expression ordered by weighted bm25
    pub fn search_fts(&self, match_expr: &str, filter: &SqlFilter, limit: usize) -> Result<Vec<IndexedRow>> {
        let sql = format!(
            r#"
            SELECT file_index.path, file_index.content, file_index.modified, file_index.tag,
                   file_metadata.title,
                   bm25(file_index, 2.0, 1.0, 1.5, 0.0, 0.0, 3.0) AS rank
            FROM file_index
            LEFT JOIN file_metadata ON file_metadata.path = file_index.path
            WHERE file_index MATCH ?{filters}
            ORDER BY rank
            LIMIT {limit}
            "#,
            filters = filter.render(),
            limit = limit as i64,
        );

        let mut values = vec![Value::Text(match_expr.to_string())];
        values.extend(filter.params.iter().cloned());

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(IndexedRow {
                    path: row.get(0)?,
                    content: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    modified: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    tag: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    title: row.get(4)?,
                    rank: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_fts_error)?;

        Ok(rows)
    }

    /// Scan content with the `REGEXP` function
    pub fn search_regex(&self, pattern: &str, filter: &SqlFilter, limit: usize) -> Result<Vec<IndexedRow>> {
        let sql = format!(
            r#"
            SELECT file_index.path, file_index.content, file_index.modified, file_index.tag,
                   file_metadata.title
            FROM file_index
            LEFT JOIN file_metadata ON file_metadata.path = file_index.path
            WHERE file_index.content REGEXP ?{filters}
            ORDER BY file_index.modified DESC
            LIMIT {limit}
            "#,
            filters = filter.render(),
            limit = limit as i64,
        );

        let mut values = vec![Value::Text(pattern.to_string())];
        values.extend(filter.params.iter().cloned());

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(IndexedRow {
                    path: row.get(0)?,
                    content: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    modified: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    tag: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    title: row.get(4)?,
                    rank: 0.0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Vocabulary terms of the index starting with `first`, most frequent first
    pub fn vocabulary(&self, first: char, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT term FROM file_index_vocab WHERE substr(term, 1, 1) = ?1 ORDER BY doc DESC LIMIT ?2",
        )?;
        let terms = stmt
            .query_map(params![first.to_string(), limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(terms)
    }

    // ========== Tag Operations ==========

    pub fn get_tags(&self, path: &str) -> Result<Vec<String>> {
        let tags: Option<String> = self
            .conn
            .query_row("SELECT tags FROM file_tags WHERE path = ?1", [path], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(tags.map(|t| split_tags(&t)).unwrap_or_default())
    }

    /// Replace the tags of a file and mirror them into the FTS `tag` column
    pub fn set_tags(&self, path: &str, tags: &[String]) -> Result<()> {
        let joined = normalize_tags(tags).join(",");
        if joined.is_empty() {
            self.conn.execute("DELETE FROM file_tags WHERE path = ?1", [path])?;
        } else {
            self.conn.execute(
                "INSERT OR REPLACE INTO file_tags (path, tags) VALUES (?1, ?2)",
                params![path, joined],
            )?;
        }
        self.conn.execute(
            "UPDATE file_index SET tag = ?1 WHERE path = ?2",
            params![joined, path],
        )?;
        Ok(())
    }

    pub fn add_tags(&self, path: &str, tags: &[String]) -> Result<Vec<String>> {
        let mut current = self.get_tags(path)?;
        current.extend(tags.iter().cloned());
        let current = normalize_tags(&current);
        self.set_tags(path, &current)?;
        Ok(current)
    }

    pub fn remove_tags(&self, path: &str, tags: &[String]) -> Result<Vec<String>> {
        let remove: Vec<String> = normalize_tags(tags);
        let current: Vec<String> = self
            .get_tags(path)?
            .into_iter()
            .filter(|t| !remove.contains(t))
            .collect();
        self.set_tags(path, &current)?;
        Ok(current)
    }

    /// Tag usage counts, most used first
    pub fn tag_counts(&self, limit: usize) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare("SELECT tags FROM file_tags")?;
        let mut counts: HashMap<String, usize> = HashMap::new();
        let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;
        for tags in rows {
            let Some(tags) = tags? else { continue };
            for tag in split_tags(&tags) {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }

        let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sorted.truncate(limit);
        Ok(sorted)
    }

    pub fn count_tagged(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_tags", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Profile Operations ==========

    pub fn save_profile(&self, profile: &ProfileRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO search_profiles (name, term, options_json, results_json, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                profile.name,
                profile.term,
                profile.options_json,
                profile.results_json,
                profile.saved_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, name: &str) -> Result<Option<ProfileRecord>> {
        self.conn
            .query_row(
                "SELECT name, term, options_json, results_json, saved_at FROM search_profiles WHERE name = ?1",
                [name],
                |row| self.row_to_profile(row),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_profiles(&self) -> Result<Vec<ProfileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, term, options_json, results_json, saved_at FROM search_profiles ORDER BY name",
        )?;
        let profiles = stmt
            .query_map([], |row| self.row_to_profile(row))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(profiles)
    }

    pub fn delete_profile(&self, name: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM search_profiles WHERE name = ?1", [name])?;
        Ok(n > 0)
    }

    fn row_to_profile(&self, row: &rusqlite::Row) -> rusqlite::Result<ProfileRecord> {
        Ok(ProfileRecord {
            name: row.get(0)?,
            term: row.get(1)?,
            options_json: row.get(2)?,
            results_json: row.get(3)?,
            saved_at: row.get(4)?,
        })
    }

    // ========== Cache Operations ==========

    pub fn get_cache(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.conn
            .query_row(
                r#"
                SELECT cache_key, term, request_json, results_json, generation, created_at, hits
                FROM search_cache WHERE cache_key = ?1
                "#,
                [key],
                |row| self.row_to_cache(row),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn put_cache(&self, entry: &CacheEntry) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO search_cache
                (cache_key, term, request_json, results_json, generation, created_at, hits)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.key,
                entry.term,
                entry.request_json,
                entry.results_json,
                entry.generation,
                entry.created_at,
                entry.hits,
            ],
        )?;
        Ok(())
    }

    pub fn record_cache_hit(&self, key: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE search_cache SET hits = hits + 1 WHERE cache_key = ?1",
            [key],
        )?;
        Ok(())
    }

    /// Entries that are outdated by generation or age, most used first
    pub fn stale_cache_entries(
        &self,
        generation: i64,
        older_than: i64,
        limit: usize,
    ) -> Result<Vec<CacheEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT cache_key, term, request_json, results_json, generation, created_at, hits
            FROM search_cache
            WHERE generation != ?1 OR created_at < ?2
            ORDER BY hits DESC, created_at DESC
            LIMIT ?3
            "#,
        )?;
        let entries = stmt
            .query_map(params![generation, older_than, limit as i64], |row| {
                self.row_to_cache(row)
            })?
            .collect::<rusqlite::Result<_>>()?;
        Ok(entries)
    }

    /// Keep only the `keep` newest cache entries; returns the number removed
    pub fn prune_cache(&self, keep: usize) -> Result<usize> {
        let removed = self.conn.execute(
            r#"
            DELETE FROM search_cache WHERE cache_key NOT IN (
                SELECT cache_key FROM search_cache ORDER BY created_at DESC LIMIT ?1
            )
            "#,
            [keep as i64],
        )?;
        Ok(removed)
    }

    pub fn clear_cache(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM search_cache", [])?)
    }

    pub fn count_cache(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM search_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_cache(&self, row: &rusqlite::Row) -> rusqlite::Result<CacheEntry> {
        Ok(CacheEntry {
            key: row.get(0)?,
            term: row.get(1)?,
            request_json: row.get(2)?,
            results_json: row.get(3)?,
            generation: row.get(4)?,
            created_at: row.get(5)?,
            hits: row.get(6)?,
        })
    }

    // ========== Cleaned Data ==========

    pub fn save_cleaned(&self, record: &CleanedRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO cleaned_data (path, cleaned_at, row_count, col_count, data_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.path,
                record.cleaned_at,
                record.row_count as i64,
                record.col_count as i64,
                record.data_json,
            ],
        )?;
        Ok(())
    }

    pub fn get_cleaned(&self, path: &str) -> Result<Option<CleanedRecord>> {
        self.conn
            .query_row(
                "SELECT path, cleaned_at, row_count, col_count, data_json FROM cleaned_data WHERE path = ?1",
                [path],
                |row| {
                    Ok(CleanedRecord {
                        path: row.get(0)?,
                        cleaned_at: row.get(1)?,
                        row_count: row.get::<_, i64>(2)? as usize,
                        col_count: row.get::<_, i64>(3)? as usize,
                        data_json: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn delete_cleaned(&self, path: &str) -> Result<bool> {
        let n = self.conn.execute("DELETE FROM cleaned_data WHERE path = ?1", [path])?;
        Ok(n > 0)
    }

    // ========== Index State ==========

    /// Counter bumped whenever indexed content changes; cache entries carry it
    pub fn generation(&self) -> Result<i64> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM index_state WHERE key = 'generation'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    pub fn bump_generation(&self) -> Result<i64> {
        let next = self.generation()? + 1;
        self.conn.execute(
            "INSERT OR REPLACE INTO index_state (key, value) VALUES ('generation', ?1)",
            [next.to_string()],
        )?;
        Ok(next)
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let db_bytes = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(DbStats {
            files: self.count_files()?,
            tagged: self.count_tagged()?,
            cache_entries: self.count_cache()?,
            profiles: self.list_profiles()?.len(),
            generation: self.generation()?,
            db_bytes,
        })
    }
}

/// Register SQL functions used by the search layer
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let re: Arc<regex::Regex> =
                ctx.get_or_create_aux(0, |vr| -> std::result::Result<_, BoxError> {
                    Ok(regex::RegexBuilder::new(vr.as_str()?)
                        .case_insensitive(true)
                        .build()?)
                })?;
            let matched = match ctx.get_raw(1) {
                ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                    .map(|text| re.is_match(text))
                    .unwrap_or(false),
                _ => false,
            };
            Ok(matched)
        },
    )
}

/// FTS5 reports bad MATCH syntax as a generic SQLite error
fn map_fts_error(err: rusqlite::Error) -> Error {
    let msg = err.to_string();
    if msg.contains("fts5") || msg.contains("syntax error") || msg.contains("no such column") {
        Error::Query(msg)
    } else {
        Error::Storage(err)
    }
}

fn dir_prefix(root: &str) -> String {
    if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{}/", root)
    }
}

/// Split a stored comma separated tag list
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Trim, drop empties and dedupe while keeping first-seen order
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags.iter().flat_map(|t| split_tags(t)) {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub files: usize,
    pub tagged: usize,
    pub cache_entries: usize,
    pub profiles: usize,
    pub generation: i64,
    pub db_bytes: u64,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Indexed files: {}", self.files)?;
        writeln!(f, "  Tagged files: {}", self.tagged)?;
        writeln!(f, "  Cached searches: {}", self.cache_entries)?;
        writeln!(f, "  Profiles: {}", self.profiles)?;
        writeln!(f, "  DB size: {:.1} KB", self.db_bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, content: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            content: content.to_string(),
            clean_content: content.to_string(),
            modified: "2024-05-01T10:00:00".to_string(),
            hash: format!("hash-{}", path),
        }
    }

    fn metadata(path: &str) -> FileMetadata {
        FileMetadata {
            path: path.to_string(),
            format: Some("txt".to_string()),
            ..Default::default()
        }
    }

    fn insert(store: &IndexStore, path: &str, content: &str) {
        store.upsert_file(&record(path, content), &metadata(path)).unwrap();
    }

    #[test]
    fn test_upsert_replaces_row() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/docs/a.txt", "first version");
        insert(&store, "/docs/a.txt", "second version");

        assert_eq!(store.count_files().unwrap(), 1);
        let (content, _) = store.get_content("/docs/a.txt").unwrap().unwrap();
        assert_eq!(content, "second version");
        assert_eq!(store.get_file_hash("/docs/a.txt").unwrap().unwrap(), "hash-/docs/a.txt");
    }

    #[test]
    fn test_fts_match_and_porter_stemming() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/docs/a.txt", "the runners were running quickly");
        insert(&store, "/docs/b.txt", "nothing to see here");

        let rows = store.search_fts("\"run\"", &SqlFilter::default(), 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/docs/a.txt");
    }

    #[test]
    fn test_fts_filter_by_path() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/docs/a.txt", "invoice total");
        insert(&store, "/other/b.txt", "invoice total");

        let mut filter = SqlFilter::default();
        filter.push("file_index.path LIKE ?", "%/docs/%".to_string());
        let rows = store.search_fts("\"invoice\"", &filter, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/docs/a.txt");
    }

    #[test]
    fn test_bad_match_is_query_error() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/docs/a.txt", "hello");
        let err = store.search_fts("AND OR", &SqlFilter::default(), 10).unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }

    #[test]
    fn test_regexp_function() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/docs/a.txt", "Order INV-2024-001 shipped");
        insert(&store, "/docs/b.txt", "no numbers");

        let rows = store
            .search_regex(r"inv-\d{4}-\d+", &SqlFilter::default(), 10)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/docs/a.txt");
    }

    #[test]
    fn test_tags_roundtrip_and_fts_mirror() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/docs/a.txt", "quarterly report");

        store
            .add_tags("/docs/a.txt", &["urgent".to_string(), "review, urgent".to_string()])
            .unwrap();
        assert_eq!(store.get_tags("/docs/a.txt").unwrap(), vec!["urgent", "review"]);

        let rows = store.search_fts("tag : \"review\"", &SqlFilter::default(), 10).unwrap();
        assert_eq!(rows.len(), 1);

        store.remove_tags("/docs/a.txt", &["review".to_string()]).unwrap();
        assert_eq!(store.get_tags("/docs/a.txt").unwrap(), vec!["urgent"]);

        // Re-indexing keeps the tags in the FTS row
        insert(&store, "/docs/a.txt", "quarterly report v2");
        let rows = store.search_fts("tag : \"urgent\"", &SqlFilter::default(), 10).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_tag_counts() {
        let store = IndexStore::open_in_memory().unwrap();
        store.set_tags("/a", &["x".to_string(), "y".to_string()]).unwrap();
        store.set_tags("/b", &["x".to_string()]).unwrap();

        let counts = store.tag_counts(10).unwrap();
        assert_eq!(counts[0], ("x".to_string(), 2));
        assert_eq!(counts[1], ("y".to_string(), 1));
        assert_eq!(store.count_tagged().unwrap(), 2);
    }

    #[test]
    fn test_rename_path_sets_alias() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/docs/old name.txt", "content");
        store.set_tags("/docs/old name.txt", &["keep".to_string()]).unwrap();

        store.rename_path("/docs/old name.txt", "/docs/new.txt").unwrap();

        assert!(store.get_file_hash("/docs/old name.txt").unwrap().is_none());
        assert!(store.get_file_hash("/docs/new.txt").unwrap().is_some());
        let meta = store.get_metadata("/docs/new.txt").unwrap().unwrap();
        assert_eq!(meta.alias.as_deref(), Some("old name.txt"));
        assert_eq!(store.get_tags("/docs/new.txt").unwrap(), vec!["keep"]);
    }

    #[test]
    fn test_hashes_under_root_respects_boundaries() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/data/my_dir/a.txt", "a");
        insert(&store, "/data/myXdir/b.txt", "b");
        insert(&store, "/data/my_dir2/c.txt", "c");

        let hashes = store.hashes_under("/data/my_dir").unwrap();
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains_key("/data/my_dir/a.txt"));
    }

    #[test]
    fn test_undecodable_rows_are_errors() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/data/a.txt", "a");
        store
            .connection()
            .execute(
                "INSERT INTO file_index (path, content, clean_content, modified, hash, tag)
                 VALUES ('/data/b.txt', 'b', 'b', '', NULL, '')",
                [],
            )
            .unwrap();

        assert!(matches!(store.hashes_under("/data"), Err(Error::Storage(_))));
    }

    #[test]
    fn test_delete_file() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/docs/a.txt", "content");
        store.set_tags("/docs/a.txt", &["t".to_string()]).unwrap();

        assert!(store.delete_file("/docs/a.txt").unwrap());
        assert_eq!(store.count_files().unwrap(), 0);
        assert_eq!(store.count_tagged().unwrap(), 0);
        assert!(store.get_metadata("/docs/a.txt").unwrap().is_none());
    }

    #[test]
    fn test_generation_and_cache() {
        let store = IndexStore::open_in_memory().unwrap();
        assert_eq!(store.generation().unwrap(), 0);
        assert_eq!(store.bump_generation().unwrap(), 1);

        for i in 0..5 {
            store
                .put_cache(&CacheEntry {
                    key: format!("k{}", i),
                    term: "t".to_string(),
                    request_json: "{}".to_string(),
                    results_json: "[]".to_string(),
                    generation: if i < 2 { 0 } else { 1 },
                    created_at: 100 + i,
                    hits: 0,
                })
                .unwrap();
        }

        let stale = store.stale_cache_entries(1, 0, 10).unwrap();
        assert_eq!(stale.len(), 2);

        assert_eq!(store.prune_cache(3).unwrap(), 2);
        assert!(store.get_cache("k0").unwrap().is_none());
        assert!(store.get_cache("k4").unwrap().is_some());

        store.record_cache_hit("k4").unwrap();
        assert_eq!(store.get_cache("k4").unwrap().unwrap().hits, 1);
    }

    #[test]
    fn test_vocabulary() {
        let store = IndexStore::open_in_memory().unwrap();
        insert(&store, "/a.txt", "budget budgets banana");
        let terms = store.vocabulary('b', 10).unwrap();
        assert!(terms.contains(&"budget".to_string()));
        assert!(terms.contains(&"banana".to_string()));
    }
}
