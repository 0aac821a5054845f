use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, LazyLock},
};

use chrono::{Days, Duration, NaiveDate};
use regex::Regex;

use crate::utils::time::{date_key, saturating_add};

use super::record::UrlEntry;

/// Something that carries time spent on a url. Lets the helpers below work on day entries as
/// well as on combined results.
pub trait UrlTime {
    fn url(&self) -> &Arc<str>;

    fn total_time(&self) -> Duration;
}

impl UrlTime for UrlEntry {
    fn url(&self) -> &Arc<str> {
        &self.url
    }

    fn total_time(&self) -> Duration {
        self.total_time
    }
}

/// Time spent on a url over several days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlUsage {
    pub url: Arc<str>,
    pub total_time: Duration,
    /// Number of days the url appeared in.
    pub occurrences: u32,
}

impl UrlUsage {
    fn new(url: Arc<str>) -> Self {
        Self {
            url,
            total_time: Duration::zero(),
            occurrences: 0,
        }
    }
}

impl UrlTime for UrlUsage {
    fn url(&self) -> &Arc<str> {
        &self.url
    }

    fn total_time(&self) -> Duration {
        self.total_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlAverage {
    pub url: Arc<str>,
    pub average: Duration,
}

impl UrlTime for UrlAverage {
    fn url(&self) -> &Arc<str> {
        &self.url
    }

    fn total_time(&self) -> Duration {
        self.average
    }
}

/// Sorts by time, longest first. Equal times keep their relative order.
pub fn sort_descending_by_time<T: UrlTime>(mut entries: Vec<T>) -> Vec<T> {
    entries.sort_by(|a, b| b.total_time().cmp(&a.total_time()));
    entries
}

/// Merges entries of several days into one entry per url, counting the days each url was seen
/// on. Urls keep the order they were first seen in.
pub fn combine_with_occurrences<'a>(
    days: impl IntoIterator<Item = &'a [UrlEntry]>,
) -> Vec<UrlUsage> {
    let mut positions = HashMap::<Arc<str>, usize>::new();
    let mut usages = Vec::<UrlUsage>::new();

    for day in days {
        let mut seen_today = HashSet::<usize>::new();
        for entry in day {
            let position = *positions.entry(entry.url.clone()).or_insert_with(|| {
                usages.push(UrlUsage::new(entry.url.clone()));
                usages.len() - 1
            });
            let usage = &mut usages[position];
            usage.total_time = saturating_add(usage.total_time, entry.total_time);
            if seen_today.insert(position) {
                usage.occurrences += 1;
            }
        }
    }

    usages
}

/// Divides every total by `divisor`. A divisor of zero or less gives zero averages instead of
/// failing.
pub fn average<T: UrlTime>(entries: &[T], divisor: i32) -> Vec<UrlAverage> {
    entries
        .iter()
        .map(|entry| UrlAverage {
            url: entry.url().clone(),
            average: if divisor > 0 {
                entry.total_time() / divisor
            } else {
                Duration::zero()
            },
        })
        .collect()
}

/// Splits date keys into those older than `window_days` before `today` and the rest.
///
/// Keys are compared as strings. That works because `YYYY-MM-DD` is fixed width and zero padded,
/// so lexical order is chronological order.
pub fn partition_by_date_window<S: AsRef<str>>(
    date_keys: impl IntoIterator<Item = S>,
    window_days: u32,
    today: NaiveDate,
) -> (Vec<String>, Vec<String>) {
    let cutoff = today
        .checked_sub_days(Days::new(window_days.into()))
        .unwrap_or(NaiveDate::MIN);
    let cutoff = date_key(cutoff);

    date_keys
        .into_iter()
        .map(|v| v.as_ref().to_string())
        .partition(|key| key.as_str() < cutoff.as_str())
}

static DATE_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$")
        .expect("Date key pattern is valid")
});

/// Keeps strings shaped like a date key. Only ASCII digits count.
///
/// Only the format is checked. Day 31 passes for every month and `2023-02-30` is accepted too,
/// since keys are produced by [date_key] and are calendar dates in practice.
pub fn filter_valid_date_keys<S: AsRef<str>>(keys: impl IntoIterator<Item = S>) -> Vec<String> {
    keys.into_iter()
        .filter(|v| DATE_KEY_PATTERN.is_match(v.as_ref()))
        .map(|v| v.as_ref().to_string())
        .collect()
}
