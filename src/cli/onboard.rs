use crate::analyzer::zone::ReferenceZone;
use crate::config::{Config, default_report_dir, expand_home};
use crate::db::Database;
use crate::journal::Category;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to ShipLog onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();

    println!("\n[1/4] Display name");
    let user_name: String = Input::with_theme(&theme)
        .with_prompt("  Name shown on your journey card")
        .default("Builder".to_string())
        .interact_text()
        .context("Failed to read display name")?;

    println!("\n[2/4] Public profile");
    let username: String = Input::with_theme(&theme)
        .with_prompt("  Username for your public profile (leave empty to skip)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read username")?;

    let (bio, profile_public) = if username.trim().is_empty() {
        (String::new(), false)
    } else {
        let bio: String = Input::with_theme(&theme)
            .with_prompt("  One-line bio (optional)")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read bio")?;
        let profile_public = Confirm::with_theme(&theme)
            .with_prompt("  Publish your profile now?")
            .default(true)
            .interact()
            .context("Failed to read profile visibility")?;
        (bio, profile_public)
    };

    println!("\n[3/4] Timezone used to decide where a day starts");
    let timezone: String = Input::with_theme(&theme)
        .with_prompt("  utc, local, or an offset like +09:00")
        .default("local".to_string())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            ReferenceZone::parse(input)
                .map(|_| ())
                .map_err(|_| "Use utc, local or an offset like +09:00")
        })
        .interact_text()
        .context("Failed to read timezone")?;

    let labels = Category::ALL
        .iter()
        .map(|category| category.label())
        .collect::<Vec<_>>();
    let selected_index = Select::with_theme(&theme)
        .with_prompt("  Default category for new entries")
        .default(0)
        .items(&labels)
        .interact()
        .context("Failed to select default category")?;
    let default_category = Category::ALL
        .get(selected_index)
        .copied()
        .unwrap_or(Category::Build);

    println!("\n[4/4] Journey card output directory");
    let default_report_dir = default_report_dir().display().to_string();
    let report_dir_input: String = Input::with_theme(&theme)
        .with_prompt("  Folder where journey cards will be saved")
        .default(default_report_dir)
        .interact_text()
        .context("Failed to read report directory")?;

    let mut config = Config {
        report_dir: expand_home(&report_dir_input),
        default_category: default_category.to_string(),
        ..Config::default()
    };
    config.set_value("user_name", &user_name)?;
    config.set_value("username", &username)?;
    config.set_value("bio", &bio)?;
    config.profile_public = profile_public;
    config.set_value("timezone", &timezone)?;

    config.ensure_bootstrap_files()?;
    config.save()?;
    let _ = Database::open(&config.db_path)?;

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Log your first update: shiplog log \"Shipped the landing page\"");
    println!("──────────────────────────────────────────");

    Ok(config)
}
