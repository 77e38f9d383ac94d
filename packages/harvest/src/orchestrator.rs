//! Sequential harvest orchestration.
//!
//! Enumerates the channel, then fetches each video one at a time in
//! listing order, reporting progress after every video. Per-video fetch
//! failures become error-carrying placeholder records and the run
//! continues; only a failed enumeration aborts the run.
//!
//! Fetches are deliberately sequential: the upstream extractor is
//! rate-limit sensitive and a run is bounded at 100 videos, so
//! predictability wins over throughput here.

use channel_scope_harvest_models::VideoRecord;

use crate::progress::{HarvestObserver, UnitProgress};
use crate::{ChannelSource, HarvestError};

/// The final result of a completed harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    /// Number of videos enumerated (and therefore of entries in `results`).
    pub total: usize,
    /// One record per enumerated video, in enumeration order. Failed
    /// fetches appear as placeholder records with `error` set.
    pub results: Vec<VideoRecord>,
}

/// Runs a full channel harvest.
///
/// Calls `observer.unit_complete` exactly once per enumerated video,
/// immediately after that video's fetch resolves, with the running
/// completed count.
///
/// # Errors
///
/// Returns [`HarvestError::Enumeration`] if the channel listing fails —
/// the only error that aborts a run. Per-video failures are recorded in
/// the results and never propagate.
pub async fn run_channel_harvest(
    source: &dyn ChannelSource,
    channel_url: &str,
    max: usize,
    observer: &dyn HarvestObserver,
) -> Result<HarvestOutcome, HarvestError> {
    let video_ids = source.list_videos(channel_url, max).await?;
    let total = video_ids.len();

    let mut results = Vec::with_capacity(total);

    for (index, video_id) in video_ids.iter().enumerate() {
        let completed = index + 1;

        match source.fetch_video(video_id).await {
            Ok(record) => {
                observer.unit_complete(UnitProgress {
                    completed,
                    total,
                    video_id,
                    error: None,
                    record: Some(&record),
                });
                results.push(record);
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("Video {video_id} failed ({completed}/{total}): {message}");
                let record = VideoRecord::failed(video_id, message.clone());
                observer.unit_complete(UnitProgress {
                    completed,
                    total,
                    video_id,
                    error: Some(&message),
                    record: None,
                });
                results.push(record);
            }
        }
    }

    Ok(HarvestOutcome { total, results })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// A scripted source: a fixed id list, with fetches failing for the
    /// ids named in `fail`.
    struct ScriptedSource {
        ids: Vec<String>,
        fail: Vec<String>,
    }

    #[async_trait]
    impl ChannelSource for ScriptedSource {
        async fn list_videos(
            &self,
            _channel_url: &str,
            max: usize,
        ) -> Result<Vec<String>, HarvestError> {
            Ok(self.ids.iter().take(max).cloned().collect())
        }

        async fn fetch_video(&self, video_id: &str) -> Result<VideoRecord, HarvestError> {
            if self.fail.iter().any(|id| id == video_id) {
                return Err(HarvestError::Fetch {
                    video_id: video_id.to_string(),
                    message: "boom".to_string(),
                });
            }
            let mut record = VideoRecord::failed(video_id, String::new());
            record.error = None;
            record.title = format!("title of {video_id}");
            Ok(record)
        }
    }

    /// A source whose enumeration itself fails.
    struct BrokenListing;

    #[async_trait]
    impl ChannelSource for BrokenListing {
        async fn list_videos(
            &self,
            _channel_url: &str,
            _max: usize,
        ) -> Result<Vec<String>, HarvestError> {
            Err(HarvestError::Enumeration {
                message: "listing failed".to_string(),
            })
        }

        async fn fetch_video(&self, _video_id: &str) -> Result<VideoRecord, HarvestError> {
            unreachable!("fetch must not run when enumeration fails")
        }
    }

    /// Records every observer call for assertion.
    #[derive(Default)]
    struct RecordingObserver {
        calls: Mutex<Vec<(usize, usize, String, bool)>>,
    }

    impl HarvestObserver for RecordingObserver {
        fn unit_complete(&self, progress: UnitProgress<'_>) {
            self.calls.lock().unwrap().push((
                progress.completed,
                progress.total,
                progress.video_id.to_string(),
                progress.error.is_some(),
            ));
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn failed_fetch_becomes_placeholder_and_run_continues() {
        let source = ScriptedSource {
            ids: ids(&["a", "b", "c", "d", "e"]),
            fail: ids(&["c"]),
        };
        let observer = RecordingObserver::default();

        let outcome = run_channel_harvest(&source, "https://example.com/@handle", 5, &observer)
            .await
            .unwrap();

        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.results.len(), 5);

        // Entry 2 (the 3rd id) carries the error; everything else is clean.
        for (i, record) in outcome.results.iter().enumerate() {
            if i == 2 {
                assert!(record.error.is_some());
                assert!(record.title.is_empty());
                assert!(record.duration_seconds.is_none());
            } else {
                assert!(record.error.is_none());
                assert!(!record.title.is_empty());
            }
        }
    }

    #[tokio::test]
    async fn results_preserve_enumeration_order() {
        let source = ScriptedSource {
            ids: ids(&["x", "y", "z"]),
            fail: vec![],
        };

        let outcome = run_channel_harvest(
            &source,
            "https://example.com/@handle",
            10,
            &crate::progress::NullObserver,
        )
        .await
        .unwrap();

        let result_ids: Vec<&str> = outcome
            .results
            .iter()
            .map(|r| r.video_id.as_str())
            .collect();
        assert_eq!(result_ids, vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn observer_called_once_per_video_with_running_count() {
        let source = ScriptedSource {
            ids: ids(&["a", "b", "c"]),
            fail: ids(&["b"]),
        };
        let observer = RecordingObserver::default();

        run_channel_harvest(&source, "https://example.com/@handle", 3, &observer)
            .await
            .unwrap();

        let calls = observer.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                (1, 3, "a".to_string(), false),
                (2, 3, "b".to_string(), true),
                (3, 3, "c".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn enumeration_failure_aborts_before_any_fetch() {
        let observer = RecordingObserver::default();

        let result = run_channel_harvest(
            &BrokenListing,
            "https://example.com/@handle",
            5,
            &observer,
        )
        .await;

        assert!(matches!(result, Err(HarvestError::Enumeration { .. })));
        assert!(observer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_channels_yield_short_outcomes() {
        let source = ScriptedSource {
            ids: ids(&["only"]),
            fail: vec![],
        };

        let outcome = run_channel_harvest(
            &source,
            "https://example.com/@tiny",
            10,
            &crate::progress::NullObserver,
        )
        .await
        .unwrap();

        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.results.len(), 1);
    }
}
