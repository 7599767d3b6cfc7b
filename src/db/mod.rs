pub mod queries;

use crate::analyzer::report::JourneyReport;
use crate::journal::{Category, Entry, Project, ValidEntry, ValidationError, timestamp_from_millis};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Which slice of the journal a caller wants. The aggregator never filters,
/// so visibility and category scoping happen here.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub category: Option<Category>,
    pub project: Option<String>,
    pub public_only: bool,
    pub limit: Option<usize>,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn public() -> Self {
        Self {
            public_only: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JourneyShareMeta {
    pub id: i64,
    pub short_id: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct JourneyShareRow {
    pub meta: JourneyShareMeta,
    pub report: JourneyReport,
}

struct EntryRecord {
    id: String,
    text: String,
    category: String,
    project: Option<String>,
    is_public: bool,
    created_at: i64,
}

impl TryFrom<EntryRecord> for Entry {
    type Error = ValidationError;

    fn try_from(record: EntryRecord) -> Result<Self, Self::Error> {
        if record.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }

        Ok(Entry {
            category: record.category.parse()?,
            created_at: timestamp_from_millis(record.created_at)?,
            id: record.id,
            text: record.text,
            project: record.project,
            is_public: record.is_public,
        })
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })?;

        self.ensure_entry_project_column()
    }

    fn ensure_entry_project_column(&self) -> Result<()> {
        let present: i64 = self
            .conn
            .query_row(queries::COUNT_ENTRY_PROJECT_COLUMN, [], |row| row.get(0))
            .context("Failed to inspect entries table")?;

        if present == 0 {
            self.conn
                .execute(queries::ADD_ENTRY_PROJECT_COLUMN, [])
                .context("Failed to add project column to entries")?;
        }

        self.conn
            .execute(queries::INDEX_ENTRIES_PROJECT, [])
            .context("Failed to initialize schema")?;

        Ok(())
    }

    /// New project names are registered as public projects on first use.
    pub fn insert_entry(&self, entry: &ValidEntry) -> Result<Entry> {
        let id = Uuid::new_v4().to_string();

        if let Some(project) = &entry.project {
            self.add_project(project, true, entry.created_at)?;
        }

        self.conn
            .execute(
                "INSERT INTO entries (id, text, category, project, is_public, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &id,
                    &entry.text,
                    entry.category.as_str(),
                    entry.project.as_deref(),
                    entry.is_public,
                    entry.created_at.timestamp_millis()
                ],
            )
            .context("Failed to insert entry")?;

        Ok(Entry {
            id,
            text: entry.text.clone(),
            category: entry.category,
            project: entry.project.clone(),
            is_public: entry.is_public,
            created_at: entry.created_at,
        })
    }

    pub fn delete_entry(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1", params![id])
            .context("Failed to delete entry")?;

        Ok(deleted > 0)
    }

    /// Newest first. Rows that no longer decode are reported as validation errors.
    pub fn entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let limit = filter
            .limit
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX))
            .unwrap_or(-1);

        let mut statement = self.conn.prepare(queries::SELECT_ENTRIES)?;
        let records = statement
            .query_map(
                params![
                    filter.category.map(Category::as_str),
                    filter.project.as_deref(),
                    filter.public_only,
                    limit
                ],
                |row| {
                    Ok(EntryRecord {
                        id: row.get(0)?,
                        text: row.get(1)?,
                        category: row.get(2)?,
                        project: row.get(3)?,
                        is_public: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query entries")?;

        records
            .into_iter()
            .map(|record| {
                let id = record.id.clone();
                Entry::try_from(record)
                    .with_context(|| format!("Stored entry {id} failed validation"))
            })
            .collect()
    }

    pub fn entry_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .context("Failed to count entries")?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn latest_entry_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let millis: Option<i64> = self
            .conn
            .query_row(
                "SELECT created_at FROM entries ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query latest entry")?;

        millis
            .map(timestamp_from_millis)
            .transpose()
            .map_err(Into::into)
    }

    /// Returns false when a project with that name already exists.
    pub fn add_project(&self, name: &str, is_public: bool, created_at: DateTime<Utc>) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                queries::INSERT_PROJECT,
                params![name, is_public, created_at.timestamp_millis()],
            )
            .with_context(|| format!("Failed to add project: {name}"))?;

        Ok(inserted > 0)
    }

    /// Returns false when no project has that name.
    pub fn set_project_visibility(&self, name: &str, is_public: bool) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE projects SET is_public = ?2 WHERE name = ?1",
                params![name, is_public],
            )
            .with_context(|| format!("Failed to update project: {name}"))?;

        Ok(updated > 0)
    }

    /// Oldest first. With `public_only`, private projects are skipped and only
    /// public entries are counted.
    pub fn projects(&self, public_only: bool) -> Result<Vec<Project>> {
        let mut statement = self.conn.prepare(queries::SELECT_PROJECTS)?;
        let rows = statement
            .query_map(params![public_only], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list projects")?;

        rows.into_iter()
            .map(|(name, is_public, created_at, entry_count)| {
                Ok(Project {
                    created_at: timestamp_from_millis(created_at)
                        .with_context(|| format!("Stored project {name} failed validation"))?,
                    name,
                    is_public,
                    entry_count: usize::try_from(entry_count).unwrap_or_default(),
                })
            })
            .collect()
    }

    pub fn insert_journey_share(
        &self,
        short_id: &str,
        report: &JourneyReport,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let report_json =
            serde_json::to_string(report).context("Failed to serialize journey report")?;

        self.conn
            .execute(
                "INSERT INTO journey_shares (short_id, user_name, created_at, report_json) VALUES (?1, ?2, ?3, ?4)",
                params![short_id, &report.user_name, created_at, report_json],
            )
            .context("Failed to save journey share")?;

        Ok(())
    }

    pub fn journey_share(&self, short_id: &str) -> Result<Option<JourneyShareRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, short_id, user_name, created_at, report_json FROM journey_shares WHERE short_id = ?1",
                params![short_id],
                |row| {
                    Ok((
                        JourneyShareMeta {
                            id: row.get(0)?,
                            short_id: row.get(1)?,
                            user_name: row.get(2)?,
                            created_at: row.get(3)?,
                        },
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query journey share")?;

        row.map(|(meta, report_json)| {
            let report = serde_json::from_str(&report_json).with_context(|| {
                format!("Failed to parse stored journey share: {}", meta.short_id)
            })?;
            Ok(JourneyShareRow { meta, report })
        })
        .transpose()
    }

    pub fn list_journey_shares(&self, limit: usize) -> Result<Vec<JourneyShareMeta>> {
        let mut statement = self.conn.prepare(
            "SELECT id, short_id, user_name, created_at
             FROM journey_shares
             ORDER BY created_at DESC
             LIMIT ?1",
        )?;

        let rows = statement
            .query_map(params![limit as i64], |row| {
                Ok(JourneyShareMeta {
                    id: row.get(0)?,
                    short_id: row.get(1)?,
                    user_name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list journey shares")?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::aggregate::aggregate;
    use crate::analyzer::report::build_journey_report;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap()
    }

    fn valid(text: &str, category: Category, is_public: bool, hours_ago: i64) -> ValidEntry {
        ValidEntry {
            text: text.to_string(),
            category,
            project: None,
            is_public,
            created_at: now() - Duration::hours(hours_ago),
        }
    }

    fn seeded() -> (Database, tempfile::TempDir) {
        let tmp = tempdir().unwrap();
        let database = Database::open(&tmp.path().join("db").join("shiplog.db")).unwrap();

        database
            .insert_entry(&valid("Refactored auth flow", Category::Build, true, 72))
            .unwrap();
        database
            .insert_entry(&valid("Pushed v2.1", Category::Launch, false, 48))
            .unwrap();
        database
            .insert_entry(&valid("Hit 1,000 users", Category::Win, true, 24))
            .unwrap();
        database
            .insert_entry(&valid("MRR grew 15%", Category::Metric, true, 1))
            .unwrap();

        (database, tmp)
    }

    #[test]
    fn entries_come_back_newest_first() {
        let (database, _tmp) = seeded();
        let entries = database.entries(&EntryFilter::all()).unwrap();

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].text, "MRR grew 15%");
        assert_eq!(entries[3].text, "Refactored auth flow");
        assert_eq!(entries[0].created_at, now() - Duration::hours(1));
        assert_eq!(database.entry_count().unwrap(), 4);
        assert_eq!(
            database.latest_entry_timestamp().unwrap(),
            Some(now() - Duration::hours(1))
        );
    }

    #[test]
    fn filters_by_visibility_category_and_limit() {
        let (database, _tmp) = seeded();

        let public = database.entries(&EntryFilter::public()).unwrap();
        assert_eq!(public.len(), 3);
        assert!(public.iter().all(|entry| entry.is_public));

        let launches = database
            .entries(&EntryFilter {
                category: Some(Category::Launch),
                ..EntryFilter::default()
            })
            .unwrap();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].text, "Pushed v2.1");

        let limited = database
            .entries(&EntryFilter {
                limit: Some(2),
                ..EntryFilter::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn delete_reports_whether_a_row_was_removed() {
        let (database, _tmp) = seeded();
        let target = database.entries(&EntryFilter::all()).unwrap()[0].id.clone();

        assert!(database.delete_entry(&target).unwrap());
        assert!(!database.delete_entry(&target).unwrap());
        assert_eq!(database.entry_count().unwrap(), 3);
    }

    #[test]
    fn corrupted_category_surfaces_as_validation_error() {
        let (database, _tmp) = seeded();
        database
            .conn
            .execute("UPDATE entries SET category = 'party' WHERE text = 'Pushed v2.1'", [])
            .unwrap();

        let error = database.entries(&EntryFilter::all()).unwrap_err();
        let validation = error.downcast_ref::<ValidationError>().unwrap();
        assert_eq!(validation.kind(), "invalid_category");
    }

    #[test]
    fn private_projects_hide_their_entries_from_public_reads() {
        let (database, _tmp) = seeded();
        database
            .insert_entry(&ValidEntry {
                project: Some("ShipLog".to_string()),
                ..valid("Shipped streak grace day", Category::Launch, true, 2)
            })
            .unwrap();
        database
            .insert_entry(&ValidEntry {
                project: Some("Stealth".to_string()),
                ..valid("Prototype works", Category::Build, true, 3)
            })
            .unwrap();
        assert!(database.set_project_visibility("Stealth", false).unwrap());
        assert!(!database.set_project_visibility("Unknown", false).unwrap());

        let public = database.entries(&EntryFilter::public()).unwrap();
        assert_eq!(public.len(), 4);
        assert!(public.iter().all(|entry| entry.project.as_deref() != Some("Stealth")));

        let shiplog = database
            .entries(&EntryFilter {
                project: Some("ShipLog".to_string()),
                ..EntryFilter::default()
            })
            .unwrap();
        assert_eq!(shiplog.len(), 1);
        assert_eq!(shiplog[0].project.as_deref(), Some("ShipLog"));

        let all_projects = database.projects(false).unwrap();
        assert_eq!(
            all_projects.iter().map(|project| project.name.as_str()).collect::<Vec<_>>(),
            vec!["Stealth", "ShipLog"]
        );
        let public_projects = database.projects(true).unwrap();
        assert_eq!(public_projects.len(), 1);
        assert_eq!(public_projects[0].name, "ShipLog");
        assert_eq!(public_projects[0].entry_count, 1);
    }

    #[test]
    fn adding_an_existing_project_keeps_its_visibility() {
        let (database, _tmp) = seeded();

        assert!(database.add_project("Side quest", false, now()).unwrap());
        assert!(!database.add_project("Side quest", true, now()).unwrap());
        database
            .insert_entry(&ValidEntry {
                project: Some("Side quest".to_string()),
                ..valid("Drafted landing copy", Category::Learn, true, 0)
            })
            .unwrap();

        let projects = database.projects(false).unwrap();
        assert_eq!(projects.len(), 1);
        assert!(!projects[0].is_public);
        assert_eq!(projects[0].entry_count, 1);
    }

    #[test]
    fn journals_without_project_column_are_upgraded() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("shiplog.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "CREATE TABLE entries (id TEXT PRIMARY KEY, text TEXT NOT NULL, category TEXT NOT NULL, is_public INTEGER NOT NULL DEFAULT 1, created_at INTEGER NOT NULL)",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO entries VALUES ('old', 'Launched v1', 'launch', 1, ?1)",
                params![now().timestamp_millis()],
            )
            .unwrap();
        }

        let database = Database::open(&path).unwrap();
        database
            .insert_entry(&ValidEntry {
                project: Some("ShipLog".to_string()),
                ..valid("Launched v2", Category::Launch, true, 0)
            })
            .unwrap();

        let entries = database.entries(&EntryFilter::all()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|entry| entry.id == "old" && entry.project.is_none()));
    }

    #[test]
    fn journey_share_round_trip() {
        let (database, _tmp) = seeded();
        let entries = database.entries(&EntryFilter::public()).unwrap();
        let stats = aggregate(&entries, now(), &Utc);
        let report = build_journey_report("Ada", &stats, &entries, now(), 5);

        database.insert_journey_share("abcDEF1234", &report, now()).unwrap();

        let stored = database.journey_share("abcDEF1234").unwrap().unwrap();
        assert_eq!(stored.report, report);
        assert_eq!(stored.meta.user_name, "Ada");
        assert_eq!(stored.meta.created_at, now());
        assert!(database.journey_share("missing").unwrap().is_none());
        assert_eq!(database.list_journey_shares(10).unwrap().len(), 1);
    }
}
