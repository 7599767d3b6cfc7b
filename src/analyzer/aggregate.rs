use crate::journal::{Category, Entry};
use chrono::{DateTime, Datelike, Days, NaiveDate, Offset, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Calendar date of an instant, as seen from the reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Instants whose local time would fall outside chrono's range keep
    /// their UTC date.
    pub fn of<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> Self {
        let utc = instant.naive_utc();
        let offset = tz.offset_from_utc_datetime(&utc).fix();

        Self(utc.checked_add_offset(offset).unwrap_or(utc).date())
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn previous(self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub streak: u32,
    pub active_day_count: usize,
    pub total_entries: usize,
    /// Monday..Sunday of the week containing "now".
    pub week_buckets: [usize; 7],
    pub category_totals: BTreeMap<Category, usize>,
}

impl AggregateResult {
    pub fn wins(&self) -> usize {
        self.category_totals
            .get(&Category::Win)
            .copied()
            .unwrap_or_default()
    }

    pub fn week_max(&self) -> usize {
        self.week_buckets.iter().copied().max().unwrap_or_default()
    }
}

/// Derives streak, active days, this week's buckets and category totals from
/// an entry snapshot. Input order does not matter and the call never fails.
pub fn aggregate<Tz: TimeZone>(entries: &[Entry], now: DateTime<Utc>, tz: &Tz) -> AggregateResult {
    let day_keys = entries
        .iter()
        .map(|entry| DayKey::of(&entry.created_at, tz))
        .collect::<Vec<_>>();
    let active_days = day_keys.iter().copied().collect::<BTreeSet<_>>();
    let today = DayKey::of(&now, tz);

    AggregateResult {
        streak: streak(&active_days, today),
        active_day_count: active_days.len(),
        total_entries: entries.len(),
        week_buckets: week_buckets(&day_keys, today),
        category_totals: category_totals(entries),
    }
}

/// Consecutive active days ending today, or ending yesterday when nothing
/// has been logged yet today.
pub fn streak(active_days: &BTreeSet<DayKey>, today: DayKey) -> u32 {
    let start = if active_days.contains(&today) {
        Some(today)
    } else {
        today.previous().filter(|day| active_days.contains(day))
    };

    let mut count = 0;
    let mut cursor = start;
    while let Some(day) = cursor.filter(|day| active_days.contains(day)) {
        count += 1;
        cursor = day.previous();
    }
    count
}

/// Entry counts per weekday of the ISO week containing `today`. Days after
/// `today` stay at zero even if future-dated entries exist.
pub fn week_buckets(day_keys: &[DayKey], today: DayKey) -> [usize; 7] {
    let mut buckets = [0; 7];
    let offset = u64::from(today.date().weekday().num_days_from_monday());
    let Some(monday) = today.date().checked_sub_days(Days::new(offset)) else {
        return buckets;
    };

    for key in day_keys.iter().filter(|key| **key <= today) {
        let index = key.date().signed_duration_since(monday).num_days();
        if (0..7).contains(&index) {
            buckets[index as usize] += 1;
        }
    }

    buckets
}

pub fn category_totals(entries: &[Entry]) -> BTreeMap<Category, usize> {
    let mut totals = Category::ALL
        .into_iter()
        .map(|category| (category, 0))
        .collect::<BTreeMap<_, _>>();

    for entry in entries {
        *totals.entry(entry.category).or_insert(0) += 1;
    }

    totals
}
