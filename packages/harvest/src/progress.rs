//! Progress observer seam for harvest runs.
//!
//! Decouples the [`orchestrator`](crate::orchestrator) from any specific
//! progress consumer (the server forwards updates into its job registry and
//! event stream; tests record them; [`NullObserver`] discards them).

use channel_scope_harvest_models::VideoRecord;

/// One per-video progress update, emitted exactly once per enumerated video
/// immediately after its fetch completes (successfully or not).
#[derive(Debug, Clone, Copy)]
pub struct UnitProgress<'a> {
    /// Videos processed so far, including this one.
    pub completed: usize,
    /// Total enumerated videos in this harvest.
    pub total: usize,
    /// The video this update is about.
    pub video_id: &'a str,
    /// The fetch error, when this video failed.
    pub error: Option<&'a str>,
    /// The fetched record, when this video succeeded.
    pub record: Option<&'a VideoRecord>,
}

/// Receives per-video progress updates from a running harvest.
///
/// Implementations must be `Send + Sync`; the orchestrator runs inside a
/// spawned task and calls the observer between awaits.
pub trait HarvestObserver: Send + Sync {
    /// Called exactly once per enumerated video, in enumeration order.
    fn unit_complete(&self, progress: UnitProgress<'_>);
}

/// An observer that ignores all updates. Useful in tests and one-shot
/// callers that only want the final outcome.
pub struct NullObserver;

impl HarvestObserver for NullObserver {
    fn unit_complete(&self, _progress: UnitProgress<'_>) {}
}
