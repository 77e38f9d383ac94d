#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory harvest job state and progress broadcast.
//!
//! A [`JobRegistry`] tracks every harvest job started in this process, and
//! a [`ProgressBroadcaster`](broadcast::ProgressBroadcaster) fans job
//! events out to attached live subscribers. Both are owned components
//! constructed once at startup and shared through the server's app state —
//! there is no global mutable registry.
//!
//! Jobs follow a strict one-way state machine: `running` → `done` or
//! `running` → `error`, exactly once. Each job has a single writer (the
//! driver task the server spawns for it); status and results queries only
//! ever read.

pub mod broadcast;
pub mod registry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

pub use broadcast::{JobEvent, ProgressBroadcaster};
pub use registry::{JobRegistry, ResultsQuery};

use channel_scope_harvest_models::VideoRecord;

/// Lifecycle state of a harvest job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    /// The harvest is in progress.
    Running,
    /// Every enumerated video was processed (individual videos may still
    /// have failed — their records carry `error`).
    Done,
    /// The harvest aborted before processing all videos.
    Error,
}

impl JobStatus {
    /// Whether no further transition can occur from this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// One harvest job tracked by the registry.
#[derive(Debug, Clone)]
pub struct Job {
    /// Opaque unique id, generated at creation, never reused.
    pub id: String,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Expected video count — the requested maximum at creation, refined
    /// to the real enumerated count once the listing resolves.
    pub total: usize,
    /// Videos processed so far.
    pub completed: usize,
    /// Per-video outcomes, populated when the job completes.
    pub results: Vec<VideoRecord>,
    /// Fatal error message, set only when `status` is `Error`.
    pub error: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// The channel this job harvests (diagnostics).
    pub channel_url: String,
    /// The requested maximum video count (diagnostics).
    pub requested_max: usize,
}

/// A cheap point-in-time view of a job, for status queries and replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Videos processed so far.
    pub completed: usize,
    /// Expected video count.
    pub total: usize,
    /// Fatal error message, when terminal with `Error`.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(JobStatus::Running).unwrap(),
            serde_json::json!("running")
        );
        assert_eq!(JobStatus::Done.to_string(), "done");
        assert_eq!(JobStatus::Error.as_ref(), "error");
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }
}
