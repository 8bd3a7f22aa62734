//! Shared domain models.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Platform key that gets the current-month freshness rule.
pub const SONY_PLATFORM: &str = "sony";

/// A single scraped release as it appears in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRelease {
    /// Category key (e.g. `sony`, `xbox`), kept exactly as given.
    pub platform: String,
    /// Day the record was scraped/published.
    #[serde(with = "release_date")]
    pub date: NaiveDate,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Cover image URL.
    #[serde(default)]
    pub image: String,
    /// Store page URL.
    #[serde(default)]
    pub link: String,
    /// Trailer watch URL.
    #[serde(default)]
    pub trailer: String,
}

impl GameRelease {
    /// Whether this release belongs to the Sony platform (case-insensitive).
    pub fn is_sony(&self) -> bool {
        is_sony_platform(&self.platform)
    }

    /// Label shown on a tile, e.g. `Updated: 01/12`.
    pub fn updated_label(&self) -> String {
        format!("Updated: {}", self.date.format("%m/%d"))
    }

    /// Whether a trailer URL is present.
    pub fn has_trailer(&self) -> bool {
        !self.trailer.trim().is_empty()
    }

    /// Autoplay embed URL for the trailer, if one is present.
    pub fn embed_url(&self) -> Option<String> {
        embed_url(&self.trailer)
    }
}

/// Case-insensitive check for the Sony platform key.
pub fn is_sony_platform(platform: &str) -> bool {
    platform.to_lowercase() == SONY_PLATFORM
}

/// Rewrite a trailer watch URL into its autoplay embed form.
pub fn embed_url(trailer: &str) -> Option<String> {
    let trailer = trailer.trim();
    if trailer.is_empty() {
        return None;
    }
    Some(format!("{}?autoplay=1", trailer.replacen("watch?v=", "embed/", 1)))
}

/// Parse a release date string at day granularity.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, naive ISO date-times
/// (with `T` or a space separator) and `MM/DD/YYYY`. Timestamps keep
/// the calendar day as written, ignoring any offset.
pub fn parse_release_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Some(timestamp.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(input, format) {
            return Some(timestamp.date());
        }
    }
    NaiveDate::parse_from_str(input, "%m/%d/%Y").ok()
}

mod release_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_release_date(&raw)
            .ok_or_else(|| D::Error::custom(format!("unrecognised release date `{raw}`")))
    }
}

/// Decoded source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseFeed {
    /// Releases in document order.
    pub releases: Vec<GameRelease>,
    /// Number of entries that could not be decoded and were dropped.
    pub skipped: usize,
}

impl ReleaseFeed {
    /// Number of accepted releases.
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    /// Whether the feed holds no releases.
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_supported_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 12);
        assert_eq!(parse_release_date("2024-01-12"), expected);
        assert_eq!(parse_release_date("2024-01-12T08:30:00Z"), expected);
        assert_eq!(parse_release_date("2024-01-12T23:30:00-05:00"), expected);
        assert_eq!(parse_release_date("2024-01-12T08:30:00.250"), expected);
        assert_eq!(parse_release_date("2024-01-12 08:30:00"), expected);
        assert_eq!(parse_release_date(" 01/12/2024 "), expected);
        assert_eq!(parse_release_date("next tuesday"), None);
    }

    #[test]
    fn decodes_record_and_ignores_extra_fields() {
        let release: GameRelease = serde_json::from_value(json!({
            "platform": "Xbox",
            "date": "2024-01-12",
            "title": "Starfield",
            "link": "https://example.com/starfield",
            "trailer": "https://www.youtube.com/watch?v=abc123",
            "price": "69.99"
        }))
        .expect("record should decode");

        assert_eq!(release.platform, "Xbox");
        assert_eq!(release.image, "");
        assert_eq!(release.updated_label(), "Updated: 01/12");
        assert!(!release.is_sony());
    }

    #[test]
    fn rejects_unparseable_dates() {
        let result = serde_json::from_value::<GameRelease>(json!({
            "platform": "sony",
            "date": "soon"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn sony_check_ignores_case() {
        assert!(is_sony_platform("SONY"));
        assert!(is_sony_platform("Sony"));
        assert!(!is_sony_platform("sony-store"));
    }

    #[test]
    fn rewrites_trailer_into_embed_url() {
        assert_eq!(
            embed_url("https://www.youtube.com/watch?v=abc123").as_deref(),
            Some("https://www.youtube.com/embed/abc123?autoplay=1")
        );
        assert_eq!(
            embed_url("https://videos.example.com/t.mp4").as_deref(),
            Some("https://videos.example.com/t.mp4?autoplay=1")
        );
        assert_eq!(embed_url("   "), None);
    }
}
