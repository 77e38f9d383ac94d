#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Channel metadata harvesting.
//!
//! Resolves a channel URL into a bounded list of video ids (via `yt-dlp`'s
//! flat playlist listing), fetches per-video metadata (via `yt-dlp` JSON
//! dumps) with a best-effort transcript lookup on an independent failure
//! domain, and drives whole-channel harvests through the sequential
//! [`orchestrator`].
//!
//! Failure isolation is the organizing principle: a video whose metadata
//! fetch fails becomes an error-carrying [`VideoRecord`] placeholder and the
//! batch keeps going; only a failed enumeration kills a harvest.

pub mod channel;
pub mod orchestrator;
pub mod progress;
pub mod transcript;
pub mod video;
pub mod ytdlp;

use async_trait::async_trait;
use channel_scope_harvest_models::VideoRecord;

use crate::transcript::TranscriptClient;
use crate::ytdlp::YtDlpRunner;

/// Default number of videos harvested when the caller doesn't say.
pub const DEFAULT_MAX_VIDEOS: usize = 10;

/// Upper bound on videos per harvest.
pub const MAX_MAX_VIDEOS: usize = 100;

/// Errors that can occur during harvesting operations.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// The channel listing could not be retrieved or parsed. Fatal to the
    /// whole harvest.
    #[error("Enumeration failed: {message}")]
    Enumeration {
        /// Description of what went wrong.
        message: String,
    },

    /// One video's core metadata fetch failed. Isolated to that video.
    #[error("Fetch failed for {video_id}: {message}")]
    Fetch {
        /// The video that failed.
        video_id: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The external extractor process could not be launched or exited
    /// abnormally.
    #[error("Extractor process error: {message}")]
    Process {
        /// Description of what went wrong.
        message: String,
    },

    /// JSON parsing of extractor output failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Clamps a requested per-harvest video count into `[1, 100]`.
///
/// `None` (absent) and `Some(0)` (the parse-failure sentinel callers map
/// invalid input to) both yield the default of 10.
#[must_use]
pub fn clamp_max_videos(requested: Option<usize>) -> usize {
    match requested {
        None | Some(0) => DEFAULT_MAX_VIDEOS,
        Some(n) => n.min(MAX_MAX_VIDEOS),
    }
}

/// A source of channel listings and per-video metadata.
///
/// The production implementation shells out to `yt-dlp`; tests drive the
/// [`orchestrator`] with scripted in-memory implementations.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Resolves a channel URL into up to `max` video ids, in listing order.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Enumeration`] if the listing call fails or
    /// yields no parseable entries.
    async fn list_videos(
        &self,
        channel_url: &str,
        max: usize,
    ) -> Result<Vec<String>, HarvestError>;

    /// Fetches the full metadata record for one video.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Fetch`] if the primary metadata fetch fails.
    /// Transcript failures never surface here.
    async fn fetch_video(&self, video_id: &str) -> Result<VideoRecord, HarvestError>;
}

/// The production [`ChannelSource`]: `yt-dlp` for listings and metadata,
/// the timed-text endpoint for transcripts.
pub struct YtDlpSource {
    runner: YtDlpRunner,
    transcripts: TranscriptClient,
}

impl YtDlpSource {
    /// Creates a source with explicit collaborators.
    #[must_use]
    pub const fn new(runner: YtDlpRunner, transcripts: TranscriptClient) -> Self {
        Self {
            runner,
            transcripts,
        }
    }

    /// Creates a source configured from the environment (`YTDLP_BIN`,
    /// `TRANSCRIPT_LANG`).
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(YtDlpRunner::from_env(), TranscriptClient::from_env())
    }
}

#[async_trait]
impl ChannelSource for YtDlpSource {
    async fn list_videos(
        &self,
        channel_url: &str,
        max: usize,
    ) -> Result<Vec<String>, HarvestError> {
        channel::list_channel_videos(&self.runner, channel_url, max).await
    }

    async fn fetch_video(&self, video_id: &str) -> Result<VideoRecord, HarvestError> {
        video::fetch_video(&self.runner, &self.transcripts, video_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_defaults_when_absent_or_invalid() {
        assert_eq!(clamp_max_videos(None), 10);
        assert_eq!(clamp_max_videos(Some(0)), 10);
    }

    #[test]
    fn clamp_caps_at_one_hundred() {
        assert_eq!(clamp_max_videos(Some(100)), 100);
        assert_eq!(clamp_max_videos(Some(101)), 100);
        assert_eq!(clamp_max_videos(Some(5000)), 100);
    }

    #[test]
    fn clamp_passes_in_range_values_through() {
        assert_eq!(clamp_max_videos(Some(1)), 1);
        assert_eq!(clamp_max_videos(Some(25)), 25);
    }
}
