#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The canonical harvested-video record and transcript types.
//!
//! Every video fetched during a channel harvest produces a [`VideoRecord`],
//! whether the fetch succeeded or not. A failed fetch is still a record —
//! the id is kept, the metadata fields are `None`, and `error` explains
//! what happened — so a batch result always has one entry per enumerated
//! video, in enumeration order.
//!
//! The serialized field names are a stable wire contract consumed by the
//! frontend; they stay snake_case regardless of the camelCase convention
//! used by the rest of the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a single harvested video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Opaque video identifier from the source platform.
    pub video_id: String,
    /// Video title. Empty when the fetch failed.
    pub title: String,
    /// Video description. Empty when the fetch failed.
    pub description: String,
    /// Full transcript text, when the supplementary transcript lookup
    /// succeeded. `None` is not an error — many videos have no captions.
    pub transcript: Option<String>,
    /// Duration in whole seconds.
    pub duration_seconds: Option<u64>,
    /// Duration as an ISO-8601 duration string (e.g. `PT4M13S`).
    pub duration_iso: Option<String>,
    /// Release date, normalized (`YYYY-MM-DD` or RFC 3339).
    pub release_date: Option<String>,
    /// View count at harvest time.
    pub view_count: Option<u64>,
    /// Like count at harvest time.
    pub like_count: Option<u64>,
    /// Comment count at harvest time.
    pub comment_count: Option<u64>,
    /// Canonical watch URL.
    pub video_url: String,
    /// Best-available thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Error message when the primary metadata fetch for this video failed.
    /// Serialized only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoRecord {
    /// Builds the placeholder record for a video whose metadata fetch
    /// failed: id and canonical URL are kept, every metadata field is
    /// empty/`None`, and `error` carries the failure message.
    #[must_use]
    pub fn failed(video_id: &str, error: String) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: String::new(),
            description: String::new(),
            transcript: None,
            duration_seconds: None,
            duration_iso: None,
            release_date: None,
            view_count: None,
            like_count: None,
            comment_count: None,
            video_url: watch_url(video_id),
            thumbnail_url: None,
            error: Some(error),
        }
    }
}

/// Returns the canonical watch URL for a video id.
#[must_use]
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// One timed caption segment from the transcript source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text.
    pub text: String,
    /// Segment start offset in seconds.
    pub start: f64,
    /// Segment duration in seconds.
    pub duration: f64,
}

/// Formats whole seconds as an ISO-8601 duration (`PT1H2M3S`).
///
/// Zero renders as `PT0S`.
#[must_use]
pub fn iso_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "PT0S".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if secs > 0 {
        out.push_str(&format!("{secs}S"));
    }
    out
}

/// Splits an 8-digit compact date (`YYYYMMDD`) into `YYYY-MM-DD`.
///
/// Returns `None` unless the input is exactly 8 ASCII digits.
#[must_use]
pub fn compact_date_to_iso(compact: &str) -> Option<String> {
    if compact.len() != 8 || !compact.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!(
        "{}-{}-{}",
        &compact[0..4],
        &compact[4..6],
        &compact[6..8]
    ))
}

/// Converts a Unix epoch timestamp to an RFC 3339 UTC string.
///
/// Returns `None` for timestamps outside chrono's representable range.
#[must_use]
pub fn epoch_to_iso(epoch: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(epoch, 0).map(|dt| dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_duration_formats_all_components() {
        assert_eq!(iso_duration(0), "PT0S");
        assert_eq!(iso_duration(45), "PT45S");
        assert_eq!(iso_duration(60), "PT1M");
        assert_eq!(iso_duration(253), "PT4M13S");
        assert_eq!(iso_duration(3600), "PT1H");
        assert_eq!(iso_duration(3723), "PT1H2M3S");
    }

    #[test]
    fn compact_date_splits_eight_digits() {
        assert_eq!(
            compact_date_to_iso("20240131").as_deref(),
            Some("2024-01-31")
        );
        assert_eq!(compact_date_to_iso("2024013"), None);
        assert_eq!(compact_date_to_iso("202401311"), None);
        assert_eq!(compact_date_to_iso("2024-1-31"), None);
        assert_eq!(compact_date_to_iso(""), None);
    }

    #[test]
    fn epoch_converts_to_rfc3339() {
        assert_eq!(
            epoch_to_iso(1_706_659_200).as_deref(),
            Some("2024-01-31T00:00:00+00:00")
        );
    }

    #[test]
    fn failed_record_keeps_id_and_url_only() {
        let record = VideoRecord::failed("abc123", "fetch failed".to_string());
        assert_eq!(record.video_id, "abc123");
        assert_eq!(record.video_url, "https://www.youtube.com/watch?v=abc123");
        assert!(record.title.is_empty());
        assert!(record.transcript.is_none());
        assert!(record.duration_seconds.is_none());
        assert_eq!(record.error.as_deref(), Some("fetch failed"));
    }

    #[test]
    fn error_field_absent_from_successful_record_json() {
        let record = VideoRecord {
            video_id: "abc".to_string(),
            title: "A title".to_string(),
            description: String::new(),
            transcript: None,
            duration_seconds: Some(253),
            duration_iso: Some(iso_duration(253)),
            release_date: Some("2024-01-31".to_string()),
            view_count: Some(10),
            like_count: None,
            comment_count: None,
            video_url: watch_url("abc"),
            thumbnail_url: None,
            error: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["duration_iso"], "PT4M13S");
    }
}
