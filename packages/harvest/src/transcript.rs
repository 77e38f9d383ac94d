//! Best-effort transcript lookup via the timed-text endpoint.
//!
//! Transcripts come from a different upstream than video metadata, and
//! their absence is normal (no captions, disabled captions, unsupported
//! language). The public entry point therefore returns `Option<String>` —
//! this module never produces a [`HarvestError`](crate::HarvestError).

use channel_scope_harvest_models::TranscriptSegment;

/// Default caption language when `TRANSCRIPT_LANG` is unset.
const DEFAULT_LANG: &str = "en";

/// Fetches caption tracks from the timed-text endpoint.
pub struct TranscriptClient {
    http: reqwest::Client,
    lang: String,
}

impl TranscriptClient {
    /// Creates a client for an explicit caption language.
    #[must_use]
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            lang: lang.into(),
        }
    }

    /// Creates a client from `TRANSCRIPT_LANG`, defaulting to `en`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var("TRANSCRIPT_LANG").unwrap_or_else(|_| DEFAULT_LANG.to_string()))
    }

    /// Fetches the transcript for a video, joined into one string.
    ///
    /// Any failure — network, HTTP status, unparseable body, empty track —
    /// yields `None` and a debug log line. Callers treat the result as an
    /// optional enrichment, never as an error signal.
    pub async fn fetch(&self, video_id: &str) -> Option<String> {
        match self.try_fetch(video_id).await {
            Ok(segments) if segments.is_empty() => {
                log::debug!("No transcript segments for {video_id}");
                None
            }
            Ok(segments) => Some(join_segments(&segments)),
            Err(e) => {
                log::debug!("Transcript lookup failed for {video_id}: {e}");
                None
            }
        }
    }

    async fn try_fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>, reqwest::Error> {
        let url = format!(
            "https://video.google.com/timedtext?lang={}&v={video_id}&fmt=json3",
            self.lang
        );

        let body: serde_json::Value = self.http.get(&url).send().await?.json().await?;
        Ok(parse_json3(&body))
    }
}

/// Parses the `json3` timed-text format into segments.
///
/// Each `events[]` entry carries a start offset, duration, and `segs[]`
/// runs of UTF-8 text. Events without text (style windows, etc.) are
/// skipped.
fn parse_json3(body: &serde_json::Value) -> Vec<TranscriptSegment> {
    body["events"]
        .as_array()
        .map(|events| {
            events
                .iter()
                .filter_map(|event| {
                    let text: String = event["segs"]
                        .as_array()?
                        .iter()
                        .filter_map(|seg| seg["utf8"].as_str())
                        .collect();
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        return None;
                    }
                    #[allow(clippy::cast_precision_loss)]
                    let start = event["tStartMs"].as_u64().unwrap_or(0) as f64 / 1000.0;
                    #[allow(clippy::cast_precision_loss)]
                    let duration = event["dDurationMs"].as_u64().unwrap_or(0) as f64 / 1000.0;
                    Some(TranscriptSegment {
                        text: trimmed.to_string(),
                        start,
                        duration,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Joins segment texts into a single transcript string.
fn join_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json3_extracts_timed_segments() {
        let body = serde_json::json!({
            "events": [
                { "tStartMs": 0, "dDurationMs": 1500,
                  "segs": [{ "utf8": "hello " }, { "utf8": "world" }] },
                { "tStartMs": 1500, "dDurationMs": 2000,
                  "segs": [{ "utf8": "second line" }] },
            ]
        });

        let segments = parse_json3(&body);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello world");
        assert!((segments[0].start - 0.0).abs() < f64::EPSILON);
        assert!((segments[1].start - 1.5).abs() < f64::EPSILON);
        assert!((segments[1].duration - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_json3_skips_textless_events() {
        let body = serde_json::json!({
            "events": [
                { "tStartMs": 0, "dDurationMs": 100 },
                { "tStartMs": 0, "dDurationMs": 100, "segs": [{ "utf8": "\n" }] },
                { "tStartMs": 100, "dDurationMs": 100, "segs": [{ "utf8": "kept" }] },
            ]
        });

        let segments = parse_json3(&body);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "kept");
    }

    #[test]
    fn parse_json3_handles_non_track_body() {
        assert!(parse_json3(&serde_json::json!({})).is_empty());
        assert!(parse_json3(&serde_json::json!(null)).is_empty());
    }

    #[test]
    fn join_segments_spaces_between_lines() {
        let segments = vec![
            TranscriptSegment {
                text: "one".to_string(),
                start: 0.0,
                duration: 1.0,
            },
            TranscriptSegment {
                text: "two".to_string(),
                start: 1.0,
                duration: 1.0,
            },
        ];
        assert_eq!(join_segments(&segments), "one two");
    }
}
