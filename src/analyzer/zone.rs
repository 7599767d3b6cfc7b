use crate::analyzer::aggregate::{AggregateResult, DayKey, aggregate};
use crate::journal::Entry;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, Local, Utc};
use std::fmt;

/// Timezone whose calendar days entries are bucketed into. Every surface
/// reads it from the same config value so day boundaries agree everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceZone {
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl ReferenceZone {
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();

        match normalized.as_str() {
            "utc" | "z" | "gmt" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => parse_offset(&normalized)
                .map(Self::Fixed)
                .with_context(|| format!("Invalid timezone: {raw}. Use utc, local or an offset like +09:00")),
        }
    }

    pub fn day_key(&self, instant: &DateTime<Utc>) -> DayKey {
        match self {
            Self::Utc => DayKey::of(instant, &Utc),
            Self::Local => DayKey::of(instant, &Local),
            Self::Fixed(offset) => DayKey::of(instant, offset),
        }
    }

    pub fn aggregate(&self, entries: &[Entry], now: DateTime<Utc>) -> AggregateResult {
        match self {
            Self::Utc => aggregate(entries, now, &Utc),
            Self::Local => aggregate(entries, now, &Local),
            Self::Fixed(offset) => aggregate(entries, now, offset),
        }
    }
}

impl fmt::Display for ReferenceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("utc"),
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => bail!("offset must start with + or -"),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((hours, minutes)) => (hours, minutes),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };

    let hours = hours.parse::<i32>().context("offset hours must be a number")?;
    let minutes = minutes
        .parse::<i32>()
        .context("offset minutes must be a number")?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        bail!("offset out of range");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).context("offset out of range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn parses_named_zones_case_insensitively() {
        assert_eq!(ReferenceZone::parse("UTC").unwrap(), ReferenceZone::Utc);
        assert_eq!(ReferenceZone::parse(" local ").unwrap(), ReferenceZone::Local);
    }

    #[test]
    fn parses_offsets() {
        let seoul = ReferenceZone::parse("+09:00").unwrap();
        let india = ReferenceZone::parse("+0530").unwrap();
        let new_york = ReferenceZone::parse("-5").unwrap();

        assert_eq!(seoul, ReferenceZone::Fixed(FixedOffset::east_opt(9 * 3600).unwrap()));
        assert_eq!(india, ReferenceZone::Fixed(FixedOffset::east_opt(19_800).unwrap()));
        assert_eq!(new_york, ReferenceZone::Fixed(FixedOffset::west_opt(5 * 3600).unwrap()));
        assert_eq!(seoul.to_string(), "+09:00");
    }

    #[test]
    fn rejects_nonsense() {
        assert!(ReferenceZone::parse("Mars/Olympus").is_err());
        assert!(ReferenceZone::parse("+25:00").is_err());
        assert!(ReferenceZone::parse("+09:75").is_err());
    }

    #[test]
    fn day_key_uses_the_offset() {
        let instant = Utc.with_ymd_and_hms(2026, 2, 17, 20, 0, 0).unwrap();

        assert_eq!(
            ReferenceZone::Utc.day_key(&instant).date(),
            NaiveDate::from_ymd_opt(2026, 2, 17).unwrap()
        );
        assert_eq!(
            ReferenceZone::parse("+09:00").unwrap().day_key(&instant).date(),
            NaiveDate::from_ymd_opt(2026, 2, 18).unwrap()
        );
    }
}
