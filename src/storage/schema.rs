//! Database schema definitions

/// FTS5 index: `content` holds Tier 1 + Tier 2 text, `clean_content` Tier 1 only
pub const CREATE_FILE_INDEX: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS file_index USING fts5(
    path,
    content,
    clean_content,
    modified UNINDEXED,
    hash UNINDEXED,
    tag,
    tokenize = 'porter',
    prefix = '2 3 4'
)
"#;

/// Row-level vocabulary over the FTS index, used for fuzzy expansion
pub const CREATE_FILE_INDEX_VOCAB: &str =
    "CREATE VIRTUAL TABLE IF NOT EXISTS file_index_vocab USING fts5vocab(file_index, 'row')";

/// Structured metadata plus Tier 2/3 tokens as JSON
pub const CREATE_FILE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS file_metadata (
    path TEXT PRIMARY KEY,
    title TEXT,
    author TEXT,
    subject TEXT,
    created TEXT,
    last_modified TEXT,
    last_modified_by TEXT,
    alias TEXT,
    format TEXT,
    size INTEGER,
    semantic_json TEXT
)
"#;

pub const CREATE_FILE_TAGS: &str = r#"
CREATE TABLE IF NOT EXISTS file_tags (
    path TEXT PRIMARY KEY,
    tags TEXT
)
"#;

pub const CREATE_SEARCH_PROFILES: &str = r#"
CREATE TABLE IF NOT EXISTS search_profiles (
    name TEXT PRIMARY KEY,
    term TEXT NOT NULL,
    options_json TEXT NOT NULL,
    results_json TEXT NOT NULL,
    saved_at TEXT NOT NULL
)
"#;

pub const CREATE_SEARCH_CACHE: &str = r#"
CREATE TABLE IF NOT EXISTS search_cache (
    cache_key TEXT PRIMARY KEY,
    term TEXT NOT NULL,
    request_json TEXT NOT NULL,
    results_json TEXT NOT NULL,
    generation INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    hits INTEGER NOT NULL DEFAULT 0
)
"#;

pub const CREATE_INDEX_STATE: &str = r#"
CREATE TABLE IF NOT EXISTS index_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// Tables produced by `analyze-csv --auto-clean`, stored as serialized rows
pub const CREATE_CLEANED_DATA: &str = r#"
CREATE TABLE IF NOT EXISTS cleaned_data (
    path TEXT PRIMARY KEY,
    cleaned_at TEXT NOT NULL,
    row_count INTEGER NOT NULL,
    col_count INTEGER NOT NULL,
    data_json TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_metadata_format ON file_metadata(format)",
    "CREATE INDEX IF NOT EXISTS idx_cache_created ON search_cache(created_at)",
];

/// Table name paired with its creation statement, in creation order
pub const TABLES: &[(&str, &str)] = &[
    ("file_index", CREATE_FILE_INDEX),
    ("file_index_vocab", CREATE_FILE_INDEX_VOCAB),
    ("file_metadata", CREATE_FILE_METADATA),
    ("file_tags", CREATE_FILE_TAGS),
    ("search_profiles", CREATE_SEARCH_PROFILES),
    ("search_cache", CREATE_SEARCH_CACHE),
    ("index_state", CREATE_INDEX_STATE),
    ("cleaned_data", CREATE_CLEANED_DATA),
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts: Vec<&'static str> = TABLES.iter().map(|(_, sql)| *sql).collect();
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// Extract the column names from a `CREATE [VIRTUAL] TABLE` statement.
///
/// FTS5 options (`tokenize`, `prefix`, ...) and table constraints are skipped;
/// column modifiers such as `UNINDEXED` or `TEXT PRIMARY KEY` are dropped.
pub fn columns_from_sql(sql: &str) -> Vec<String> {
    let Some(open) = sql.find('(') else {
        return Vec::new();
    };
    let Some(close) = sql.rfind(')') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    let mut columns = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    let inner = &sql[open + 1..close];

    let push = |part: &str, columns: &mut Vec<String>| {
        let part = part.trim();
        if part.is_empty() || part.contains('=') {
            return;
        }
        let name: String = part
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_lowercase();
        let reserved = ["primary", "unique", "constraint", "foreign", "check"];
        if !name.is_empty() && !reserved.contains(&name.as_str()) && !columns.contains(&name) {
            columns.push(name);
        }
    };

    for c in inner.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                push(&current, &mut columns);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push(&current, &mut columns);

    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fts_columns() {
        let cols = columns_from_sql(CREATE_FILE_INDEX);
        assert_eq!(cols, vec!["path", "content", "clean_content", "modified", "hash", "tag"]);
    }

    #[test]
    fn test_table_columns_skip_constraints() {
        let cols = columns_from_sql(
            "CREATE TABLE t (path TEXT, tag TEXT, PRIMARY KEY (path, tag))",
        );
        assert_eq!(cols, vec!["path", "tag"]);
    }

    #[test]
    fn test_metadata_columns() {
        let cols = columns_from_sql(CREATE_FILE_METADATA);
        assert!(cols.contains(&"semantic_json".to_string()));
        assert!(cols.contains(&"alias".to_string()));
        assert_eq!(cols[0], "path");
    }
}
