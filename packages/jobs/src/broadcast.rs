//! Per-job progress fan-out.
//!
//! Subscribers are unbounded mpsc senders, one per attached live stream.
//! [`ProgressBroadcaster::attach`] registers the subscriber and replays the
//! job's current state as a single operation under the subscriber-set lock:
//! a publish running concurrently is either reflected in the replayed
//! snapshot or delivered live afterwards, so an attaching subscriber can
//! neither miss nor double-receive an event.
//!
//! Delivery is best-effort per subscriber: a send to a disconnected
//! channel drops that subscriber and nothing else.

use std::collections::HashMap;
use std::sync::Mutex;

use channel_scope_harvest_models::VideoRecord;
use tokio::sync::mpsc::UnboundedSender;

use crate::{JobRegistry, JobSnapshot, JobStatus};

/// An event on a job's progress stream.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// Snapshot of the job's current state. Published when the driver
    /// starts and replayed to every newly attached subscriber.
    Status {
        /// Current lifecycle state.
        status: JobStatus,
        /// Videos processed so far.
        completed: usize,
        /// Expected video count.
        total: usize,
    },
    /// One video finished processing (successfully or not).
    Progress {
        /// Videos processed so far, including this one.
        completed: usize,
        /// Total enumerated videos.
        total: usize,
        /// The video this update is about.
        video_id: String,
        /// The fetch error, when this video failed.
        error: Option<String>,
        /// The fetched record, when this video succeeded.
        record: Option<VideoRecord>,
    },
    /// The job finished processing every enumerated video.
    Done {
        /// The finished job's id.
        job_id: String,
        /// Number of videos processed.
        total: usize,
    },
    /// The job aborted.
    Error {
        /// What killed the job.
        error: String,
    },
}

impl JobEvent {
    /// The event name used on the wire (`event:` field of an SSE frame).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Progress { .. } => "progress",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// The event's JSON payload (`data:` field of an SSE frame).
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Status {
                status,
                completed,
                total,
            } => serde_json::json!({
                "status": status,
                "completed": completed,
                "total": total,
            }),
            Self::Progress {
                completed,
                total,
                video_id,
                error,
                record,
            } => serde_json::json!({
                "completed": completed,
                "total": total,
                "videoId": video_id,
                "error": error,
                "record": record,
            }),
            Self::Done { job_id, total } => serde_json::json!({
                "ok": true,
                "jobId": job_id,
                "total": total,
            }),
            Self::Error { error } => serde_json::json!({ "error": error }),
        }
    }

    /// Builds the replayed `status` event for a snapshot.
    #[must_use]
    pub const fn status_of(snapshot: &JobSnapshot) -> Self {
        Self::Status {
            status: snapshot.status,
            completed: snapshot.completed,
            total: snapshot.total,
        }
    }
}

/// Fan-out of [`JobEvent`]s to the live subscribers of each job.
pub struct ProgressBroadcaster {
    subscribers: Mutex<HashMap<String, Vec<UnboundedSender<JobEvent>>>>,
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBroadcaster {
    /// Creates a broadcaster with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Attaches a subscriber to a job's stream and replays current state.
    ///
    /// The registry is consulted *inside* the subscriber-set lock so the
    /// replayed snapshot and subsequent live events form one gapless
    /// sequence. Behavior by job state:
    ///
    /// - unknown id: one `error` event, subscriber not registered (its
    ///   stream ends immediately);
    /// - running: `status` replay, then registered for live events;
    /// - terminal: `status` replay plus the terminal `done`/`error` event,
    ///   subscriber not registered (nothing further will ever publish).
    ///
    /// # Panics
    ///
    /// Panics if the subscriber-set lock is poisoned.
    pub fn attach(&self, registry: &JobRegistry, job_id: &str, tx: UnboundedSender<JobEvent>) {
        let mut subscribers = self.subscribers.lock().expect("subscriber set lock poisoned");

        let Some(snapshot) = registry.snapshot(job_id) else {
            let _ = tx.send(JobEvent::Error {
                error: format!("unknown job id: {job_id}"),
            });
            return;
        };

        let _ = tx.send(JobEvent::status_of(&snapshot));

        match snapshot.status {
            JobStatus::Running => {
                subscribers.entry(job_id.to_string()).or_default().push(tx);
            }
            JobStatus::Done => {
                let _ = tx.send(JobEvent::Done {
                    job_id: job_id.to_string(),
                    total: snapshot.total,
                });
            }
            JobStatus::Error => {
                let _ = tx.send(JobEvent::Error {
                    error: snapshot
                        .error
                        .unwrap_or_else(|| "harvest failed".to_string()),
                });
            }
        }
    }

    /// Delivers an event to every subscriber currently attached to a job.
    ///
    /// Subscribers whose channel is gone are dropped from the set; their
    /// failure never affects other subscribers or the publishing driver.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber-set lock is poisoned.
    pub fn publish(&self, job_id: &str, event: &JobEvent) {
        let mut subscribers = self.subscribers.lock().expect("subscriber set lock poisoned");

        let Some(senders) = subscribers.get_mut(job_id) else {
            return;
        };

        let before = senders.len();
        senders.retain(|tx| tx.send(event.clone()).is_ok());
        let dropped = before - senders.len();
        if dropped > 0 {
            log::debug!(
                "Dropped {dropped} disconnected subscriber(s) from job {job_id} ({} left)",
                senders.len()
            );
        }
    }

    /// Ends every subscriber stream for a job and forgets the set.
    ///
    /// Called once when the job reaches a terminal state. Dropping the
    /// senders closes each subscriber's channel, which ends its SSE
    /// stream. Later attaches for the id replay from the registry instead.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber-set lock is poisoned.
    pub fn close_all(&self, job_id: &str) {
        let removed = self
            .subscribers
            .lock()
            .expect("subscriber set lock poisoned")
            .remove(job_id);

        if let Some(senders) = removed {
            log::debug!(
                "Closed {} subscriber stream(s) for finished job {job_id}",
                senders.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;

    fn sample_record(id: &str) -> VideoRecord {
        let mut record = VideoRecord::failed(id, String::new());
        record.error = None;
        record.title = format!("title {id}");
        record
    }

    fn progress_event(completed: usize, total: usize, id: &str) -> JobEvent {
        JobEvent::Progress {
            completed,
            total,
            video_id: id.to_string(),
            error: None,
            record: Some(sample_record(id)),
        }
    }

    #[test]
    fn attach_unknown_job_sends_error_then_ends() {
        let registry = JobRegistry::new();
        let broadcaster = ProgressBroadcaster::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        broadcaster.attach(&registry, "nope", tx);

        assert!(matches!(rx.try_recv(), Ok(JobEvent::Error { .. })));
        // The sender was never registered, so the channel is closed.
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn attach_running_job_replays_status_then_delivers_live_events() {
        let registry = JobRegistry::new();
        let broadcaster = ProgressBroadcaster::new();
        let id = registry.create_job("https://example.com/@handle", 3);

        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.attach(&registry, &id, tx);

        let Ok(JobEvent::Status {
            status, completed, ..
        }) = rx.try_recv()
        else {
            panic!("expected a status replay first");
        };
        assert_eq!(status, JobStatus::Running);
        assert_eq!(completed, 0);

        broadcaster.publish(&id, &progress_event(1, 3, "a"));
        let Ok(JobEvent::Progress { completed, .. }) = rx.try_recv() else {
            panic!("expected a live progress event");
        };
        assert_eq!(completed, 1);
    }

    #[test]
    fn attach_after_done_receives_exactly_one_terminal_event() {
        let registry = JobRegistry::new();
        let broadcaster = ProgressBroadcaster::new();
        let id = registry.create_job("https://example.com/@handle", 1);
        registry.complete(&id, vec![sample_record("a")]);
        broadcaster.close_all(&id);

        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.attach(&registry, &id, tx);

        assert!(matches!(
            rx.try_recv(),
            Ok(JobEvent::Status {
                status: JobStatus::Done,
                ..
            })
        ));
        assert!(matches!(rx.try_recv(), Ok(JobEvent::Done { .. })));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn attach_after_failure_replays_error_with_message() {
        let registry = JobRegistry::new();
        let broadcaster = ProgressBroadcaster::new();
        let id = registry.create_job("https://example.com/@handle", 1);
        registry.fail(&id, "listing failed".to_string());

        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.attach(&registry, &id, tx);

        assert!(matches!(rx.try_recv(), Ok(JobEvent::Status { .. })));
        let Ok(JobEvent::Error { error }) = rx.try_recv() else {
            panic!("expected the terminal error event");
        };
        assert_eq!(error, "listing failed");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn disconnected_subscribers_are_pruned_without_harming_others() {
        let registry = JobRegistry::new();
        let broadcaster = ProgressBroadcaster::new();
        let id = registry.create_job("https://example.com/@handle", 2);

        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        broadcaster.attach(&registry, &id, tx_dead);
        broadcaster.attach(&registry, &id, tx_live);
        drop(rx_dead);

        broadcaster.publish(&id, &progress_event(1, 2, "a"));
        broadcaster.publish(&id, &progress_event(2, 2, "b"));

        // The live subscriber saw its replay plus both progress events.
        assert!(matches!(rx_live.try_recv(), Ok(JobEvent::Status { .. })));
        assert!(matches!(rx_live.try_recv(), Ok(JobEvent::Progress { .. })));
        assert!(matches!(rx_live.try_recv(), Ok(JobEvent::Progress { .. })));
    }

    #[test]
    fn close_all_ends_attached_streams() {
        let registry = JobRegistry::new();
        let broadcaster = ProgressBroadcaster::new();
        let id = registry.create_job("https://example.com/@handle", 1);

        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.attach(&registry, &id, tx);
        assert!(matches!(rx.try_recv(), Ok(JobEvent::Status { .. })));

        broadcaster.close_all(&id);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn mid_run_subscriber_sees_replay_then_increasing_progress_then_terminal() {
        let registry = JobRegistry::new();
        let broadcaster = ProgressBroadcaster::new();
        let id = registry.create_job("https://example.com/@handle", 3);

        // Two videos already processed before this subscriber arrives.
        registry.record_progress(&id, 1, 3);
        broadcaster.publish(&id, &progress_event(1, 3, "a"));
        registry.record_progress(&id, 2, 3);
        broadcaster.publish(&id, &progress_event(2, 3, "b"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.attach(&registry, &id, tx);

        registry.record_progress(&id, 3, 3);
        broadcaster.publish(&id, &progress_event(3, 3, "c"));
        registry.complete(
            &id,
            vec![sample_record("a"), sample_record("b"), sample_record("c")],
        );
        broadcaster.publish(
            &id,
            &JobEvent::Done {
                job_id: id.clone(),
                total: 3,
            },
        );
        broadcaster.close_all(&id);

        let Ok(JobEvent::Status {
            completed, status, ..
        }) = rx.try_recv()
        else {
            panic!("expected the status replay first");
        };
        assert_eq!(status, JobStatus::Running);
        assert_eq!(completed, 2);

        let Ok(JobEvent::Progress { completed, .. }) = rx.try_recv() else {
            panic!("expected the remaining live progress event");
        };
        assert_eq!(completed, 3);

        assert!(matches!(rx.try_recv(), Ok(JobEvent::Done { .. })));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn event_wire_shapes() {
        let done = JobEvent::Done {
            job_id: "j1".to_string(),
            total: 4,
        };
        assert_eq!(done.kind(), "done");
        assert_eq!(
            done.payload(),
            serde_json::json!({ "ok": true, "jobId": "j1", "total": 4 })
        );

        let progress = progress_event(2, 4, "abc");
        assert_eq!(progress.kind(), "progress");
        let payload = progress.payload();
        assert_eq!(payload["videoId"], "abc");
        assert_eq!(payload["completed"], 2);
        assert!(payload["error"].is_null());
        assert_eq!(payload["record"]["video_id"], "abc");
    }
}
