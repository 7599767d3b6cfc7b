pub mod aggregate;
pub mod report;
pub mod zone;

use crate::analyzer::aggregate::AggregateResult;
use crate::analyzer::report::{JourneyReport, SavedReport};
use crate::config::Config;
use crate::db::{Database, EntryFilter};
use crate::journal::{Entry, Project};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub user_name: String,
    pub username: String,
    pub bio: Option<String>,
    pub stats: AggregateResult,
    pub projects: Vec<Project>,
    pub entries: Vec<Entry>,
}

impl PublicProfile {
    /// Newest published entries, at most `limit` of them.
    pub fn recent_entries(&self, limit: usize) -> &[Entry] {
        &self.entries[..limit.min(self.entries.len())]
    }
}

#[derive(Debug)]
pub struct SharedJourney {
    pub short_id: String,
    pub share_path: String,
    pub report: JourneyReport,
    pub saved: SavedReport,
}

/// Loads the scoped snapshot and aggregates it in the configured timezone.
/// Any `limit` on the filter is ignored so statistics always cover the whole scope.
pub fn stats_for(
    config: &Config,
    database: &Database,
    filter: &EntryFilter,
    now: DateTime<Utc>,
) -> Result<(Vec<Entry>, AggregateResult)> {
    let zone = config.reference_zone()?;
    let entries = database.entries(&EntryFilter {
        limit: None,
        ..filter.clone()
    })?;
    let stats = zone.aggregate(&entries, now);

    Ok((entries, stats))
}

/// `None` unless the profile is published under a username.
pub fn public_profile(
    config: &Config,
    database: &Database,
    now: DateTime<Utc>,
) -> Result<Option<PublicProfile>> {
    let Some(username) = config.published_username() else {
        return Ok(None);
    };

    let (entries, stats) = stats_for(config, database, &EntryFilter::public(), now)?;
    let projects = database.projects(true)?;

    Ok(Some(PublicProfile {
        user_name: config.user_name.clone(),
        username: username.to_string(),
        bio: config.bio.clone(),
        stats,
        projects,
        entries,
    }))
}

/// Builds the journey card from public entries, writes it to the report
/// directory and stores a snapshot under a fresh short id.
pub fn generate_and_share_journey(config: &Config, now: DateTime<Utc>) -> Result<SharedJourney> {
    let zone = config.reference_zone()?;
    let database = Database::open(&config.db_path)?;
    let (entries, stats) = stats_for(config, &database, &EntryFilter::public(), now)?;

    let report = report::build_journey_report(
        &config.user_name,
        &stats,
        &entries,
        now,
        config.recent_limit,
    );
    let short_id = report::generate_short_id();
    let saved = report::save_report_files(
        &report,
        &config.report_dir,
        zone.day_key(&now).date(),
        &short_id,
    )?;

    database.insert_journey_share(&short_id, &report, now)?;
    info!(short_id = %short_id, streak = report.streak, "journey share stored");

    Ok(SharedJourney {
        share_path: report::share_path(&short_id),
        short_id,
        report,
        saved,
    })
}
