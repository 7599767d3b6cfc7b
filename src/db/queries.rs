pub const CREATE_ENTRIES: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
  id          TEXT PRIMARY KEY,
  text        TEXT NOT NULL,
  category    TEXT NOT NULL,
  project     TEXT,
  is_public   INTEGER NOT NULL DEFAULT 1,
  created_at  INTEGER NOT NULL
);
"#;

pub const CREATE_PROJECTS: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
  name        TEXT PRIMARY KEY,
  is_public   INTEGER NOT NULL DEFAULT 1,
  created_at  INTEGER NOT NULL
);
"#;

pub const CREATE_JOURNEY_SHARES: &str = r#"
CREATE TABLE IF NOT EXISTS journey_shares (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  short_id    TEXT NOT NULL UNIQUE,
  user_name   TEXT NOT NULL,
  created_at  TEXT NOT NULL,
  report_json TEXT NOT NULL
);
"#;

pub const INDEX_ENTRIES_CREATED_AT: &str =
    "CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at);";

pub const INDEX_ENTRIES_CATEGORY: &str =
    "CREATE INDEX IF NOT EXISTS idx_entries_category ON entries(category);";

pub const INDEX_ENTRIES_PROJECT: &str =
    "CREATE INDEX IF NOT EXISTS idx_entries_project ON entries(project);";

// Journals created before projects existed lack the column.
pub const COUNT_ENTRY_PROJECT_COLUMN: &str =
    "SELECT COUNT(*) FROM pragma_table_info('entries') WHERE name = 'project'";

pub const ADD_ENTRY_PROJECT_COLUMN: &str = "ALTER TABLE entries ADD COLUMN project TEXT";

/// Public means the entry is public and its project, if any, is too.
pub const SELECT_ENTRIES: &str = "SELECT e.id, e.text, e.category, e.project, e.is_public, e.created_at
     FROM entries e
     LEFT JOIN projects p ON p.name = e.project
     WHERE (?1 IS NULL OR e.category = ?1)
       AND (?2 IS NULL OR e.project = ?2)
       AND (?3 = 0 OR (e.is_public = 1 AND COALESCE(p.is_public, 1) = 1))
     ORDER BY e.created_at DESC, e.id ASC
     LIMIT ?4";

pub const INSERT_PROJECT: &str =
    "INSERT OR IGNORE INTO projects (name, is_public, created_at) VALUES (?1, ?2, ?3)";

pub const SELECT_PROJECTS: &str = "SELECT p.name, p.is_public, p.created_at,
            COUNT(CASE WHEN ?1 = 0 OR e.is_public = 1 THEN e.id END)
     FROM projects p
     LEFT JOIN entries e ON e.project = p.name
     WHERE ?1 = 0 OR p.is_public = 1
     GROUP BY p.name, p.is_public, p.created_at
     ORDER BY p.created_at ASC, p.name ASC";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_ENTRIES,
        CREATE_PROJECTS,
        CREATE_JOURNEY_SHARES,
        INDEX_ENTRIES_CREATED_AT,
        INDEX_ENTRIES_CATEGORY,
    ]
}
