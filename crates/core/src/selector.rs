//! Per-platform release selection.
//!
//! Releases are partitioned by their platform key and each partition is
//! narrowed to the records considered current. Sony releases are current
//! when scraped in the same calendar month as `today`; every other
//! platform keeps only its most recent scrape day. A partition that ends
//! up empty falls back to the most-recent-day rule, so every observed
//! platform yields at least one release.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::models::{is_sony_platform, GameRelease};

/// Rule that produced a platform's releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessRule {
    /// Scraped within the calendar month and year of `today`.
    CurrentMonth,
    /// Scraped on the latest day seen for the platform.
    LatestScrape,
}

/// Selected releases for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformReleases {
    /// Platform key as it appeared in the input.
    pub platform: String,
    /// Rule whose output is in `releases`.
    pub rule: FreshnessRule,
    /// Whether the primary rule came up empty and the latest-scrape
    /// rule was applied instead.
    pub fell_back: bool,
    /// Releases in input order.
    pub releases: Vec<GameRelease>,
}

/// Platform key to selected releases, ordered by first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSelection {
    groups: Vec<PlatformReleases>,
}

impl PlatformSelection {
    /// Releases selected for `platform` (exact key match).
    pub fn get(&self, platform: &str) -> Option<&[GameRelease]> {
        self.group(platform).map(|group| group.releases.as_slice())
    }

    /// Full selection entry for `platform` (exact key match).
    pub fn group(&self, platform: &str) -> Option<&PlatformReleases> {
        self.groups.iter().find(|group| group.platform == platform)
    }

    /// Iterate entries in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = &PlatformReleases> {
        self.groups.iter()
    }

    /// Platform keys in first-appearance order.
    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.platform.as_str())
    }

    /// Platforms whose primary rule selected nothing.
    pub fn fallbacks(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .filter(|group| group.fell_back)
            .map(|group| group.platform.as_str())
    }

    /// Number of platforms.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no platform was observed.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of selected releases across platforms.
    pub fn release_count(&self) -> usize {
        self.groups.iter().map(|group| group.releases.len()).sum()
    }
}

/// Select the current releases for every platform present in `releases`.
pub fn select(releases: &[GameRelease], today: NaiveDate) -> PlatformSelection {
    let groups = partition(releases)
        .into_iter()
        .map(|(platform, records)| select_platform(platform, &records, today))
        .collect();
    PlatformSelection { groups }
}

fn partition(releases: &[GameRelease]) -> Vec<(&str, Vec<&GameRelease>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut partitions: Vec<(&str, Vec<&GameRelease>)> = Vec::new();
    for release in releases {
        let key = release.platform.as_str();
        let slot = *index.entry(key).or_insert_with(|| {
            partitions.push((key, Vec::new()));
            partitions.len() - 1
        });
        partitions[slot].1.push(release);
    }
    partitions
}

fn select_platform(platform: &str, records: &[&GameRelease], today: NaiveDate) -> PlatformReleases {
    let (rule, kept) = if is_sony_platform(platform) {
        (FreshnessRule::CurrentMonth, current_month(records, today))
    } else {
        (FreshnessRule::LatestScrape, latest_scrape(records))
    };

    let (rule, fell_back, kept) = if kept.is_empty() {
        (FreshnessRule::LatestScrape, true, latest_scrape(records))
    } else {
        (rule, false, kept)
    };

    PlatformReleases {
        platform: platform.to_string(),
        rule,
        fell_back,
        releases: kept.into_iter().cloned().collect(),
    }
}

fn current_month<'a>(records: &[&'a GameRelease], today: NaiveDate) -> Vec<&'a GameRelease> {
    records
        .iter()
        .copied()
        .filter(|release| release.date.year() == today.year() && release.date.month() == today.month())
        .collect()
}

fn latest_scrape<'a>(records: &[&'a GameRelease]) -> Vec<&'a GameRelease> {
    let Some(most_recent) = records.iter().map(|release| release.date).max() else {
        return Vec::new();
    };
    records
        .iter()
        .copied()
        .filter(|release| release.date == most_recent)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid test date")
    }

    fn release(platform: &str, date: &str, title: &str) -> GameRelease {
        GameRelease {
            platform: platform.to_string(),
            date: day(date),
            title: title.to_string(),
            image: String::new(),
            link: format!("https://example.com/{title}"),
            trailer: String::new(),
        }
    }

    fn titles(selection: &PlatformSelection, platform: &str) -> Vec<String> {
        selection
            .get(platform)
            .unwrap_or_default()
            .iter()
            .map(|release| release.title.clone())
            .collect()
    }

    #[test]
    fn empty_input_selects_nothing() {
        let selection = select(&[], day("2024-01-20"));
        assert!(selection.is_empty());
        assert_eq!(selection.release_count(), 0);
    }

    #[test]
    fn keeps_latest_scrape_for_regular_platforms() {
        let releases = vec![
            release("xbox", "2024-01-10", "old"),
            release("xbox", "2024-01-12", "new"),
        ];
        let selection = select(&releases, day("2024-01-20"));

        assert_eq!(selection.len(), 1);
        assert_eq!(titles(&selection, "xbox"), vec!["new"]);
        let group = selection.group("xbox").expect("xbox group");
        assert_eq!(group.rule, FreshnessRule::LatestScrape);
        assert!(!group.fell_back);
    }

    #[test]
    fn keeps_every_release_sharing_the_latest_day() {
        let releases = vec![
            release("nintendo", "2024-01-12", "a"),
            release("nintendo", "2024-01-03", "b"),
            release("nintendo", "2024-01-12", "c"),
        ];
        let selection = select(&releases, day("2024-03-01"));
        assert_eq!(titles(&selection, "nintendo"), vec!["a", "c"]);
    }

    #[test]
    fn sony_keeps_current_month() {
        let releases = vec![
            release("sony", "2024-01-05", "january"),
            release("sony", "2023-12-30", "december"),
            release("sony", "2024-01-19", "also-january"),
        ];
        let selection = select(&releases, day("2024-01-20"));

        assert_eq!(titles(&selection, "sony"), vec!["january", "also-january"]);
        let group = selection.group("sony").expect("sony group");
        assert_eq!(group.rule, FreshnessRule::CurrentMonth);
        assert!(!group.fell_back);
    }

    #[test]
    fn sony_month_must_match_year() {
        let releases = vec![
            release("sony", "2023-01-05", "last-year"),
            release("sony", "2023-01-02", "older"),
        ];
        let selection = select(&releases, day("2024-01-20"));

        assert_eq!(titles(&selection, "sony"), vec!["last-year"]);
        assert_eq!(selection.fallbacks().collect::<Vec<_>>(), vec!["sony"]);
    }

    #[test]
    fn sony_falls_back_to_latest_scrape() {
        let releases = vec![release("sony", "2023-12-05", "december")];
        let selection = select(&releases, day("2024-01-20"));

        assert_eq!(titles(&selection, "sony"), vec!["december"]);
        let group = selection.group("sony").expect("sony group");
        assert_eq!(group.rule, FreshnessRule::LatestScrape);
        assert!(group.fell_back);
    }

    #[test]
    fn sony_rule_applies_regardless_of_case() {
        let releases = vec![
            release("Sony", "2024-01-02", "early"),
            release("Sony", "2024-01-15", "late"),
        ];
        let selection = select(&releases, day("2024-01-20"));
        assert_eq!(titles(&selection, "Sony"), vec!["early", "late"]);
        assert!(selection.get("sony").is_none());
    }

    #[test]
    fn platform_keys_stay_case_sensitive() {
        let releases = vec![
            release("xbox", "2024-01-10", "lower"),
            release("Xbox", "2024-01-12", "upper"),
        ];
        let selection = select(&releases, day("2024-01-20"));

        assert_eq!(selection.platforms().collect::<Vec<_>>(), vec!["xbox", "Xbox"]);
        assert_eq!(titles(&selection, "xbox"), vec!["lower"]);
        assert_eq!(titles(&selection, "Xbox"), vec!["upper"]);
    }

    #[test]
    fn every_observed_platform_is_present_and_non_empty() {
        let releases = vec![
            release("nintendo", "2024-01-01", "n1"),
            release("sony", "2022-06-01", "s1"),
            release("xbox", "2024-01-11", "x1"),
            release("sony", "2022-05-01", "s2"),
            release("pc", "2023-11-11", "p1"),
        ];
        let selection = select(&releases, day("2024-01-20"));

        assert_eq!(
            selection.platforms().collect::<Vec<_>>(),
            vec!["nintendo", "sony", "xbox", "pc"]
        );
        for group in selection.iter() {
            assert!(!group.releases.is_empty(), "{} is empty", group.platform);
            assert!(group
                .releases
                .iter()
                .all(|release| release.platform == group.platform));
        }
        assert_eq!(titles(&selection, "sony"), vec!["s1"]);
    }

    #[test]
    fn selection_is_deterministic_and_leaves_input_untouched() {
        let releases = vec![
            release("sony", "2024-01-05", "a"),
            release("xbox", "2024-01-10", "b"),
            release("xbox", "2024-01-12", "c"),
        ];
        let snapshot = releases.clone();
        let today = day("2024-01-20");

        assert_eq!(select(&releases, today), select(&releases, today));
        assert_eq!(releases, snapshot);
    }
}
