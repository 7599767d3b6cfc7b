mod analyzer;
mod api;
mod cli;
mod clock;
mod config;
mod db;
mod journal;

use crate::analyzer::aggregate::{AggregateResult, WEEKDAY_LABELS};
use crate::analyzer::report::time_ago;
use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands, ProjectCommands};
use crate::clock::{Clock, FixedClock, SystemClock};
use crate::config::Config;
use crate::db::{Database, EntryFilter};
use crate::journal::{Category, Entry, NewEntry, parse_timestamp, project_name};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use dialoguer::{Input, theme::ColorfulTheme};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let clock: Box<dyn Clock> = match cli.as_of.as_deref() {
        Some(raw) => Box::new(FixedClock(parse_timestamp(raw)?)),
        None => Box::new(SystemClock),
    };
    let clock = clock.as_ref();

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Log {
            text,
            category,
            project,
            private,
            at,
        } => handle_log(clock, text, category, project, private, at),
        Commands::List {
            category,
            project,
            public,
            limit,
        } => handle_list(clock, category, project, public, limit),
        Commands::Delete { id } => handle_delete(&id),
        Commands::Project { command } => handle_project_command(clock, command),
        Commands::Stats { public, json } => handle_stats(clock, public, json),
        Commands::Profile => handle_profile(clock),
        Commands::Share => handle_share(clock),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Serve => {
            let config = load_config()?;
            run_service(config).await
        }
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_log(
    clock: &dyn Clock,
    text: Option<String>,
    category: Option<String>,
    project: Option<String>,
    private: bool,
    at: Option<String>,
) -> Result<()> {
    let config = load_or_default_config()?;
    let category = category.unwrap_or_else(|| config.default_category.clone());

    let text = match text {
        Some(text) => text,
        None => {
            let prompt = category
                .parse::<Category>()
                .map(Category::placeholder)
                .unwrap_or("What did you ship today?");
            Input::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .context("Failed to read entry text")?
        }
    };

    let input = NewEntry {
        text,
        category,
        project,
        is_public: config.default_public && !private,
        created_at: at,
    };
    let valid = input.validate(clock.now())?;

    let database = Database::open(&config.db_path)?;
    let entry = database.insert_entry(&valid)?;
    info!(id = %entry.id, category = %entry.category, "entry logged");

    let (_, stats) = analyzer::stats_for(&config, &database, &EntryFilter::all(), clock.now())?;
    println!("Logged [{}] {}", entry.category.label(), entry.text);
    println!("- id: {}", entry.id);
    println!("- visibility: {}", visibility(&entry));
    println!("🔥 {} day streak", stats.streak);

    Ok(())
}

fn handle_list(
    clock: &dyn Clock,
    category: Option<String>,
    project: Option<String>,
    public: bool,
    limit: usize,
) -> Result<()> {
    let config = load_or_default_config()?;
    let filter = EntryFilter {
        category: category.as_deref().map(str::parse::<Category>).transpose()?,
        project: project.as_deref().and_then(project_name),
        public_only: public,
        limit: Some(limit.max(1)),
    };

    let database = Database::open(&config.db_path)?;
    let entries = database.entries(&filter)?;

    if entries.is_empty() {
        println!("No entries yet. Log one with: shiplog log \"Shipped X\"");
        return Ok(());
    }

    let now = clock.now();
    entries
        .iter()
        .for_each(|entry| println!("{}", format_entry_line(entry, now)));

    Ok(())
}

fn handle_delete(id: &str) -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;

    if !database.delete_entry(id)? {
        bail!("No entry found with id: {id}");
    }

    info!(id = %id, "entry deleted");
    println!("Deleted entry {id}");
    Ok(())
}

fn handle_project_command(clock: &dyn Clock, command: ProjectCommands) -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;

    match command {
        ProjectCommands::Add { name, private } => {
            let name = project_name(&name).context("Project name must not be empty")?;
            if !database.add_project(&name, !private, clock.now())? {
                bail!("Project already exists: {name}");
            }

            info!(project = %name, is_public = !private, "project added");
            println!("Added project {name} ({})", if private { "private" } else { "public" });
        }
        ProjectCommands::List => {
            let projects = database.projects(false)?;
            if projects.is_empty() {
                println!("No projects yet. Tag an entry with: shiplog log \"Shipped X\" --project <name>");
            }
            projects.iter().for_each(|project| {
                println!(
                    "- {} ({}, {} entries)",
                    project.name,
                    if project.is_public { "public" } else { "private" },
                    project.entry_count
                )
            });
        }
        ProjectCommands::Publish { name } => set_project_visibility(&database, &name, true)?,
        ProjectCommands::Hide { name } => set_project_visibility(&database, &name, false)?,
    }

    Ok(())
}

fn set_project_visibility(database: &Database, name: &str, is_public: bool) -> Result<()> {
    let name = name.trim();
    if !database.set_project_visibility(name, is_public)? {
        bail!("No project found with name: {name}");
    }

    info!(project = %name, is_public, "project visibility changed");
    println!(
        "Project {name} is now {}",
        if is_public { "public" } else { "private" }
    );
    Ok(())
}

fn handle_stats(clock: &dyn Clock, public: bool, json: bool) -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;
    let filter = if public {
        EntryFilter::public()
    } else {
        EntryFilter::all()
    };

    let (_, stats) = analyzer::stats_for(&config, &database, &filter, clock.now())?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
        );
    } else {
        print_stats(&stats);
    }

    Ok(())
}

fn handle_profile(clock: &dyn Clock) -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;
    let Some(profile) = analyzer::public_profile(&config, &database, clock.now())? else {
        println!("Public profile is not published.");
        if config.username.is_none() {
            println!("- Pick a username: shiplog config set profile.username <name>");
        }
        if !config.profile_public {
            println!("- Publish it: shiplog config set profile.public true");
        }
        return Ok(());
    };

    println!("{} (@{})", profile.user_name, profile.username);
    if let Some(bio) = &profile.bio {
        println!("{bio}");
    }
    println!();
    print_stats(&profile.stats);

    println!("\nPublic projects");
    if profile.projects.is_empty() {
        println!("- No public projects yet");
    }
    profile
        .projects
        .iter()
        .for_each(|project| println!("- {} ({} entries)", project.name, project.entry_count));

    let now = clock.now();
    println!("\nPublic entries");
    if profile.entries.is_empty() {
        println!("- Nothing public yet");
    }
    profile
        .recent_entries(config.recent_limit)
        .iter()
        .for_each(|entry| println!("{}", format_entry_line(entry, now)));

    Ok(())
}

fn handle_share(clock: &dyn Clock) -> Result<()> {
    let config = load_or_default_config()?;
    let shared = analyzer::generate_and_share_journey(&config, clock.now())?;

    println!("Journey card generated for {}", shared.report.user_name);
    println!("- Share path: {}", shared.share_path);
    println!("- Markdown: {}", shared.saved.markdown_path.display());
    println!("- JSON: {}", shared.saved.json_path.display());

    Ok(())
}

fn handle_status() -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;

    println!("ShipLog status");
    println!("- user_name: {}", config.user_name);
    println!("- timezone: {}", config.timezone);
    println!("- entries: {}", database.entry_count()?);
    println!(
        "- last_logged_at: {}",
        database
            .latest_entry_timestamp()?
            .map(|timestamp| timestamp.to_rfc3339())
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "- latest_share: {}",
        database
            .list_journey_shares(1)?
            .first()
            .map(|share| share.short_id.clone())
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = match Config::load_or_init() {
        Ok(config) => config,
        Err(error) => {
            println!("[WARN] config.json unreadable: {error:#}");
            println!("doctor result: fix or remove the config file, then run doctor again");
            return Ok(());
        }
    };

    match Database::open(&config.db_path) {
        Ok(database) => match database.entries(&EntryFilter::all()) {
            Ok(entries) => println!(
                "[OK] SQLite reachable: {} ({} entries)",
                config.db_path.display(),
                entries.len()
            ),
            Err(error) => {
                println!("[WARN] Stored entries failed validation: {error:#}");
                issues.push("invalid entries".to_string());
            }
        },
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    if config.report_dir.exists() {
        println!("[OK] report dir exists: {}", config.report_dir.display());
    } else {
        println!("[WARN] report dir missing: {}", config.report_dir.display());
        issues.push("report dir missing".to_string());
    }

    match config.reference_zone() {
        Ok(zone) => println!("[OK] timezone valid: {zone}"),
        Err(error) => {
            println!("[WARN] invalid timezone setting: {error}");
            issues.push("invalid timezone".to_string());
        }
    }

    if let Err(error) = config.default_category.parse::<Category>() {
        println!("[WARN] invalid default_category: {error}");
        issues.push("invalid default category".to_string());
    } else {
        println!("[OK] default category: {}", config.default_category);
    }

    match config.published_username() {
        Some(username) => println!("[OK] public profile published as @{username}"),
        None => println!("[OK] public profile not published"),
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    config.reference_zone()?;
    let _ = Database::open(&config.db_path)?;

    let shared_config = Arc::new(config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    info!("ShipLog service started");

    tokio::select! {
        api_result = api::run_server(shared_config, clock) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn print_stats(stats: &AggregateResult) {
    let max_count = stats.week_max().max(1);

    println!("🔥 {} day streak", stats.streak);
    println!(
        "Logs: {}  Days: {}  Wins: {}",
        stats.total_entries,
        stats.active_day_count,
        stats.wins()
    );

    println!("\nThis week");
    WEEKDAY_LABELS
        .iter()
        .zip(stats.week_buckets)
        .for_each(|(day, count)| {
            let width = (count * 20).div_ceil(max_count);
            println!("{day} {:<20} {count}", "█".repeat(width));
        });

    println!("\nCategories");
    stats
        .category_totals
        .iter()
        .for_each(|(category, count)| println!("- {}: {count}", category.label()));
}

fn format_entry_line(entry: &Entry, now: DateTime<Utc>) -> String {
    let project = entry
        .project
        .as_deref()
        .map(|project| format!(" #{project}"))
        .unwrap_or_default();

    format!(
        "{} [{}] {}{project} ({}, {})",
        entry.id,
        entry.category.label(),
        entry.text,
        time_ago(entry.created_at, now),
        visibility(entry)
    )
}

fn visibility(entry: &Entry) -> &'static str {
    if entry.is_public { "public" } else { "private" }
}

fn load_or_default_config() -> Result<Config> {
    let config = Config::load_or_init()?;
    config.ensure_bootstrap_files()?;
    Ok(config)
}

fn load_config() -> Result<Config> {
    Config::load()
        .with_context(|| "Config file not found. Run `shiplog onboard` first.".to_string())
}
