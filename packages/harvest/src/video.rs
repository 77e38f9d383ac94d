//! Per-video metadata fetch.
//!
//! The primary metadata dump (via `yt-dlp`) and the supplementary
//! transcript lookup are on independent failure domains: a missing
//! transcript leaves the field `None`, while a failed metadata dump is a
//! [`HarvestError::Fetch`] surfaced to the caller.

use channel_scope_harvest_models::{
    compact_date_to_iso, epoch_to_iso, iso_duration, watch_url, VideoRecord,
};

use crate::transcript::TranscriptClient;
use crate::ytdlp::YtDlpRunner;
use crate::HarvestError;

/// Fetches the full metadata record for one video.
///
/// # Errors
///
/// Returns [`HarvestError::Fetch`] when the metadata dump fails. A failed
/// transcript lookup is not an error — the record's `transcript` is `None`.
pub async fn fetch_video(
    runner: &YtDlpRunner,
    transcripts: &TranscriptClient,
    video_id: &str,
) -> Result<VideoRecord, HarvestError> {
    let url = watch_url(video_id);

    let metadata = runner
        .dump_json(&["--dump-single-json", "--no-download", &url])
        .await
        .map_err(|e| HarvestError::Fetch {
            video_id: video_id.to_string(),
            message: e.to_string(),
        })?;

    let transcript = transcripts.fetch(video_id).await;

    Ok(parse_video_json(video_id, &metadata, transcript))
}

/// Maps a `yt-dlp` single-video JSON dump onto a [`VideoRecord`].
fn parse_video_json(
    video_id: &str,
    metadata: &serde_json::Value,
    transcript: Option<String>,
) -> VideoRecord {
    let duration_seconds = metadata["duration"].as_u64();

    VideoRecord {
        video_id: video_id.to_string(),
        title: metadata["title"].as_str().unwrap_or_default().to_string(),
        description: metadata["description"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        transcript,
        duration_seconds,
        duration_iso: duration_seconds.map(iso_duration),
        release_date: normalize_release_date(metadata),
        view_count: metadata["view_count"].as_u64(),
        like_count: metadata["like_count"].as_u64(),
        comment_count: metadata["comment_count"].as_u64(),
        video_url: metadata["webpage_url"]
            .as_str()
            .map_or_else(|| watch_url(video_id), String::from),
        thumbnail_url: best_thumbnail(metadata),
        error: None,
    }
}

/// Normalizes the release date from the dump's candidate fields.
///
/// The 8-digit compact `upload_date` wins; otherwise an epoch
/// `release_timestamp`/`timestamp` converts to RFC 3339; otherwise `None`.
fn normalize_release_date(metadata: &serde_json::Value) -> Option<String> {
    if let Some(compact) = metadata["upload_date"].as_str() {
        if let Some(iso) = compact_date_to_iso(compact) {
            return Some(iso);
        }
    }

    metadata["release_timestamp"]
        .as_i64()
        .or_else(|| metadata["timestamp"].as_i64())
        .and_then(epoch_to_iso)
}

/// Picks the best-available thumbnail: the dump's top-level `thumbnail`,
/// falling back to the last (highest-resolution) entry of `thumbnails`.
fn best_thumbnail(metadata: &serde_json::Value) -> Option<String> {
    if let Some(url) = metadata["thumbnail"].as_str() {
        return Some(url.to_string());
    }

    metadata["thumbnails"]
        .as_array()
        .and_then(|thumbs| thumbs.last())
        .and_then(|thumb| thumb["url"].as_str())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dump() -> serde_json::Value {
        serde_json::json!({
            "id": "abc123",
            "title": "A sample video",
            "description": "About things.",
            "duration": 253,
            "upload_date": "20240131",
            "view_count": 12345,
            "like_count": 678,
            "comment_count": 90,
            "webpage_url": "https://www.youtube.com/watch?v=abc123",
            "thumbnail": "https://i.ytimg.com/vi/abc123/maxresdefault.jpg",
        })
    }

    #[test]
    fn parses_full_dump() {
        let record = parse_video_json("abc123", &sample_dump(), Some("hi there".to_string()));

        assert_eq!(record.video_id, "abc123");
        assert_eq!(record.title, "A sample video");
        assert_eq!(record.duration_seconds, Some(253));
        assert_eq!(record.duration_iso.as_deref(), Some("PT4M13S"));
        assert_eq!(record.release_date.as_deref(), Some("2024-01-31"));
        assert_eq!(record.view_count, Some(12345));
        assert_eq!(record.transcript.as_deref(), Some("hi there"));
        assert_eq!(
            record.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/abc123/maxresdefault.jpg")
        );
        assert!(record.error.is_none());
    }

    #[test]
    fn missing_stats_become_none_not_zero() {
        let dump = serde_json::json!({
            "title": "Sparse",
            "webpage_url": "https://www.youtube.com/watch?v=xyz",
        });
        let record = parse_video_json("xyz", &dump, None);

        assert_eq!(record.view_count, None);
        assert_eq!(record.like_count, None);
        assert_eq!(record.duration_seconds, None);
        assert_eq!(record.duration_iso, None);
        assert_eq!(record.release_date, None);
        assert_eq!(record.thumbnail_url, None);
    }

    #[test]
    fn epoch_timestamp_used_when_compact_date_missing() {
        let dump = serde_json::json!({
            "title": "Timestamped",
            "release_timestamp": 1_706_659_200,
        });
        let record = parse_video_json("xyz", &dump, None);
        assert_eq!(
            record.release_date.as_deref(),
            Some("2024-01-31T00:00:00+00:00")
        );
    }

    #[test]
    fn malformed_compact_date_falls_back_to_timestamp() {
        let dump = serde_json::json!({
            "upload_date": "2024",
            "timestamp": 1_706_659_200,
        });
        let record = parse_video_json("xyz", &dump, None);
        assert_eq!(
            record.release_date.as_deref(),
            Some("2024-01-31T00:00:00+00:00")
        );
    }

    #[test]
    fn thumbnail_falls_back_to_last_list_entry() {
        let dump = serde_json::json!({
            "thumbnails": [
                { "url": "https://i.ytimg.com/vi/xyz/default.jpg" },
                { "url": "https://i.ytimg.com/vi/xyz/hqdefault.jpg" },
            ],
        });
        let record = parse_video_json("xyz", &dump, None);
        assert_eq!(
            record.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/xyz/hqdefault.jpg")
        );
    }

    #[test]
    fn watch_url_derived_when_dump_lacks_webpage_url() {
        let record = parse_video_json("xyz", &serde_json::json!({}), None);
        assert_eq!(record.video_url, "https://www.youtube.com/watch?v=xyz");
    }
}
