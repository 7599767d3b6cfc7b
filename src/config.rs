use crate::analyzer::zone::ReferenceZone;
use crate::journal::Category;
use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".shiplog";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_TIMEZONE: &str = "local";
pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_name: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    /// The public profile is only served when this is set and a username exists.
    pub profile_public: bool,
    pub timezone: String,
    pub default_category: String,
    pub default_public: bool,
    pub recent_limit: usize,
    pub report_dir: PathBuf,
    pub db_path: PathBuf,
    pub api_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            user_name: "Builder".to_string(),
            username: None,
            bio: None,
            profile_public: false,
            timezone: DEFAULT_TIMEZONE.to_string(),
            default_category: "build".to_string(),
            default_public: true,
            recent_limit: DEFAULT_RECENT_LIMIT,
            report_dir: default_report_dir(),
            db_path: root.join("db").join("shiplog.db"),
            api_port: 7890,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.username = config.username.as_deref().and_then(normalize_username);

        Ok(config)
    }

    /// Loads the config at `config_path`, writing defaults there only when no
    /// file exists yet. A file that exists but does not parse is an error.
    pub fn load_or_init_at(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load_from(config_path);
        }

        let config = Self::default();
        config.save_to(config_path)?;
        Ok(config)
    }

    pub fn load_or_init() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_or_init_at(&config_path)
    }

    /// The username under which the profile is published, if it is published.
    pub fn published_username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .filter(|_| self.profile_public)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        fs::create_dir_all(&self.report_dir).with_context(|| {
            format!(
                "Failed to create report directory: {}",
                self.report_dir.as_path().display()
            )
        })?;

        Ok(())
    }

    pub fn reference_zone(&self) -> Result<ReferenceZone> {
        ReferenceZone::parse(&self.timezone)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let normalized = normalize_config_key(key);

        match normalized {
            "user_name" => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    bail!("user_name must not be empty");
                }
                self.user_name = trimmed.to_string();
            }
            "username" => match normalize_username(value) {
                None => self.username = None,
                Some(username)
                    if username
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
                {
                    self.username = Some(username);
                }
                Some(_) => bail!("username may only contain letters, digits, '-' and '_'"),
            },
            "bio" => {
                let trimmed = value.trim();
                self.bio = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            "profile_public" => {
                self.profile_public = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("profile_public must be true/false"))?;
            }
            "timezone" => {
                let zone = ReferenceZone::parse(value)?;
                self.timezone = zone.to_string();
            }
            "default_category" => {
                let category = value.parse::<Category>()?;
                self.default_category = category.to_string();
            }
            "default_public" => {
                self.default_public = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("default_public must be true/false"))?;
            }
            "recent_limit" => {
                self.recent_limit = value
                    .parse::<usize>()
                    .map_err(|_| anyhow!("recent_limit must be a number"))?
                    .clamp(1, 50);
            }
            "report_dir" => {
                self.report_dir = expand_home(value);
            }
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: user_name|profile.name, username|profile.username, bio|profile.bio, profile_public|profile.public, timezone|time.zone, default_category|entry.category, default_public|entry.public, recent_limit|journey.recent, report_dir|report.dir, db_path|db.path, api_port|api.port"
                );
            }
        }

        if normalized == "report_dir" {
            fs::create_dir_all(&self.report_dir).with_context(|| {
                format!(
                    "Failed to create report directory: {}",
                    self.report_dir.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "user_name" => Some(self.user_name.clone()),
            "username" => Some(
                self.username
                    .clone()
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "bio" => Some(self.bio.clone().unwrap_or_default()),
            "profile_public" => Some(self.profile_public.to_string()),
            "timezone" => Some(self.timezone.clone()),
            "default_category" => Some(self.default_category.clone()),
            "default_public" => Some(self.default_public.to_string()),
            "recent_limit" => Some(self.recent_limit.to_string()),
            "report_dir" => Some(self.report_dir.display().to_string()),
            "db_path" => Some(self.db_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "user_name" | "profile.name" => "user_name",
        "username" | "profile.username" => "username",
        "bio" | "profile.bio" => "bio",
        "profile_public" | "profile.public" => "profile_public",
        "timezone" | "time.zone" => "timezone",
        "default_category" | "entry.category" => "default_category",
        "default_public" | "entry.public" => "default_public",
        "recent_limit" | "journey.recent" => "recent_limit",
        "report_dir" | "report.dir" => "report_dir",
        "db_path" | "db.path" => "db_path",
        "api_port" | "api.port" => "api_port",
        _ => key,
    }
}

/// Canonical form of a public username: no leading '@', trimmed, lowercase.
pub fn normalize_username(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('@').trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

pub fn default_report_dir() -> PathBuf {
    default_root_dir().join("journeys")
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
