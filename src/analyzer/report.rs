use crate::analyzer::aggregate::{AggregateResult, WEEKDAY_LABELS};
use crate::journal::{Category, Entry};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const SHORT_ID_LEN: usize = 10;
const BAR_WIDTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekDatum {
    pub day: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub text: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

/// The shareable "journey card": headline stats plus the latest entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyReport {
    pub user_name: String,
    pub generated_at: DateTime<Utc>,
    pub streak: u32,
    pub total_logs: usize,
    pub active_days: usize,
    pub wins: usize,
    pub week_data: Vec<WeekDatum>,
    pub categories: BTreeMap<Category, usize>,
    pub recent: Vec<RecentEntry>,
}

#[derive(Debug)]
pub struct SavedReport {
    pub markdown_path: PathBuf,
    pub json_path: PathBuf,
}

pub fn build_journey_report(
    user_name: &str,
    stats: &AggregateResult,
    entries: &[Entry],
    generated_at: DateTime<Utc>,
    recent_limit: usize,
) -> JourneyReport {
    let week_data = WEEKDAY_LABELS
        .iter()
        .zip(stats.week_buckets)
        .map(|(day, count)| WeekDatum {
            day: day.to_string(),
            count,
        })
        .collect::<Vec<_>>();

    let mut newest_first = entries.iter().collect::<Vec<_>>();
    newest_first.sort_by(|left, right| {
        right
            .created_at
            .cmp(&left.created_at)
            .then_with(|| left.id.cmp(&right.id))
    });

    let recent = newest_first
        .into_iter()
        .take(recent_limit)
        .map(|entry| RecentEntry {
            text: entry.text.clone(),
            category: entry.category,
            created_at: entry.created_at,
        })
        .collect::<Vec<_>>();

    JourneyReport {
        user_name: user_name.to_string(),
        generated_at,
        streak: stats.streak,
        total_logs: stats.total_entries,
        active_days: stats.active_day_count,
        wins: stats.wins(),
        week_data,
        categories: stats.category_totals.clone(),
        recent,
    }
}

pub fn render_markdown(report: &JourneyReport) -> String {
    let max_count = report
        .week_data
        .iter()
        .map(|datum| datum.count)
        .max()
        .unwrap_or_default()
        .max(1);

    let week_rows = report
        .week_data
        .iter()
        .map(|datum| format!("{} {} {}", datum.day, week_bar(datum.count, max_count), datum.count))
        .collect::<Vec<_>>()
        .join("\n");

    let category_rows = Category::ALL
        .iter()
        .map(|category| {
            format!(
                "| {} | {} |",
                category.label(),
                report.categories.get(category).copied().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let recent_rows = if report.recent.is_empty() {
        "- Nothing logged yet".to_string()
    } else {
        report
            .recent
            .iter()
            .map(|entry| {
                format!(
                    "- **{}** {} _({})_",
                    entry.category.label(),
                    entry.text,
                    time_ago(entry.created_at, report.generated_at)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "# ShipLog · {}\n\n🔥 **{} day streak**\n\n| Logs | Days | Wins |\n|------|------|------|\n| {} | {} | {} |\n\n## This Week\n```text\n{}\n```\n\n## Categories\n| Category | Entries |\n|----------|---------|\n{}\n\n## Recent\n{}\n",
        report.user_name,
        report.streak,
        report.total_logs,
        report.active_days,
        report.wins,
        week_rows,
        category_rows,
        recent_rows
    )
}

/// Files are named `journey-<date>-<short_id>` so several shares on one day
/// each keep their own card.
pub fn save_report_files(
    report: &JourneyReport,
    report_dir: &Path,
    date: NaiveDate,
    short_id: &str,
) -> Result<SavedReport> {
    fs::create_dir_all(report_dir).with_context(|| {
        format!(
            "Failed to create report directory: {}",
            report_dir.display()
        )
    })?;

    let stem = format!("journey-{}-{short_id}", date.format("%Y-%m-%d"));
    let markdown_path = report_dir.join(format!("{stem}.md"));
    let json_path = report_dir.join(format!("{stem}.json"));

    fs::write(&markdown_path, render_markdown(report)).with_context(|| {
        format!(
            "Failed to write Markdown report: {}",
            markdown_path.display()
        )
    })?;

    let json_content =
        serde_json::to_string_pretty(report).context("Failed to serialize report JSON")?;
    fs::write(&json_path, json_content)
        .with_context(|| format!("Failed to write JSON report: {}", json_path.display()))?;

    Ok(SavedReport {
        markdown_path,
        json_path,
    })
}

pub fn generate_short_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_ID_LEN)
        .map(char::from)
        .collect()
}

pub fn share_path(short_id: &str) -> String {
    format!("/journey/{short_id}")
}

pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = now.signed_duration_since(then).num_minutes();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if minutes < 60 * 24 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / (60 * 24))
    }
}

fn week_bar(count: usize, max_count: usize) -> String {
    if count == 0 {
        return "░".to_string();
    }

    let width = (count * BAR_WIDTH).div_ceil(max_count).max(1);
    "█".repeat(width)
}
