use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Build,
    Launch,
    Metric,
    Learn,
    Win,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Build,
        Category::Launch,
        Category::Metric,
        Category::Learn,
        Category::Win,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Build => "build",
            Category::Launch => "launch",
            Category::Metric => "metric",
            Category::Learn => "learn",
            Category::Win => "win",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Build => "Build",
            Category::Launch => "Launch",
            Category::Metric => "Metric",
            Category::Learn => "Learn",
            Category::Win => "Win",
        }
    }

    /// Prompt shown when composing an entry of this category.
    pub fn placeholder(self) -> &'static str {
        match self {
            Category::Build => "What did you build today?",
            Category::Launch => "What did you launch today?",
            Category::Metric => "What metric moved today?",
            Category::Learn => "What did you learn today?",
            Category::Win => "What's your win today?",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "build" => Ok(Category::Build),
            "launch" => Ok(Category::Launch),
            "metric" => Ok(Category::Metric),
            "learn" => Ok(Category::Learn),
            "win" => Ok(Category::Win),
            _ => Err(ValidationError::InvalidCategory(raw.to_string())),
        }
    }
}

/// Rejections raised before an entry may reach the store or the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid category: {0:?} (expected build, launch, metric, learn or win)")]
    InvalidCategory(String),
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("entry text must not be empty")]
    EmptyText,
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::InvalidCategory(_) => "invalid_category",
            ValidationError::InvalidTimestamp(_) => "invalid_timestamp",
            ValidationError::EmptyText => "empty_text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub text: String,
    pub category: Category,
    #[serde(default)]
    pub project: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Raw user input as it arrives from the CLI or the API.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// An entry that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEntry {
    pub text: String,
    pub category: Category,
    pub project: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// A named stream of work entries can be filed under. Entries of a private
/// project never reach public surfaces, even when the entry itself is public.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub entry_count: usize,
}

fn default_public() -> bool {
    true
}

/// Blank names mean "no project".
pub fn project_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl NewEntry {
    /// Validates the input; `now` becomes the creation time when none was given.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ValidEntry, ValidationError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }

        let category = self.category.parse::<Category>()?;

        let created_at = self
            .created_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?
            .unwrap_or(now);

        Ok(ValidEntry {
            text: text.to_string(),
            category,
            project: self.project.as_deref().and_then(project_name),
            is_public: self.is_public,
            created_at,
        })
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidTimestamp(raw.to_string()))
}

pub fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| ValidationError::InvalidTimestamp(millis.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 18, 9, 30, 0).unwrap()
    }

    fn input(text: &str, category: &str) -> NewEntry {
        NewEntry {
            text: text.to_string(),
            category: category.to_string(),
            project: None,
            is_public: true,
            created_at: None,
        }
    }

    #[test]
    fn validate_trims_text_and_defaults_timestamp() {
        let valid = input("  Shipped the onboarding flow  ", "Build")
            .validate(now())
            .unwrap();

        assert_eq!(valid.text, "Shipped the onboarding flow");
        assert_eq!(valid.category, Category::Build);
        assert_eq!(valid.created_at, now());
    }

    #[test]
    fn whitespace_only_text_is_empty_text() {
        let error = input("   \n\t", "win").validate(now()).unwrap_err();
        assert_eq!(error, ValidationError::EmptyText);
        assert_eq!(error.kind(), "empty_text");
    }

    #[test]
    fn unknown_category_is_rejected() {
        let error = input("Hit 1,000 users", "celebration")
            .validate(now())
            .unwrap_err();
        assert_eq!(error.kind(), "invalid_category");
    }

    #[test]
    fn explicit_timestamp_is_converted_to_utc() {
        let mut entry = input("Pushed v2.1", "launch");
        entry.created_at = Some("2026-02-17T23:15:00+09:00".to_string());

        let valid = entry.validate(now()).unwrap();
        assert_eq!(
            valid.created_at,
            Utc.with_ymd_and_hms(2026, 2, 17, 14, 15, 0).unwrap()
        );
    }

    #[test]
    fn garbage_timestamp_is_invalid_timestamp() {
        let mut entry = input("Pushed v2.1", "launch");
        entry.created_at = Some("yesterday-ish".to_string());

        assert_eq!(
            entry.validate(now()).unwrap_err().kind(),
            "invalid_timestamp"
        );
    }

    #[test]
    fn blank_project_means_no_project() {
        let mut entry = input("Wired up billing", "build");
        entry.project = Some("   ".to_string());
        assert_eq!(entry.validate(now()).unwrap().project, None);

        entry.project = Some(" ShipLog CLI ".to_string());
        assert_eq!(
            entry.validate(now()).unwrap().project.as_deref(),
            Some("ShipLog CLI")
        );
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Metric).unwrap();
        assert_eq!(json, "\"metric\"");
        assert_eq!(" WIN ".parse::<Category>().unwrap(), Category::Win);
    }
}
