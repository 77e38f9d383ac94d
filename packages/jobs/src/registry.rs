//! The process-wide job registry.
//!
//! Each job has exactly one writer — the driver task spawned for it —
//! which calls [`JobRegistry::record_progress`] and one of
//! [`JobRegistry::complete`] / [`JobRegistry::fail`]. Everything else
//! reads snapshots. Lock sections are short and never held across an
//! await.
//!
//! Jobs are never removed: this registry is in-memory and scoped to the
//! process lifetime, so a completed job stays queryable until restart.

use std::collections::HashMap;
use std::sync::RwLock;

use channel_scope_harvest_models::VideoRecord;

use crate::{Job, JobSnapshot, JobStatus};

/// Outcome of a results query for a known job.
#[derive(Debug, Clone)]
pub enum ResultsQuery {
    /// The job is done; here is every per-video outcome in enumeration
    /// order.
    Ready(Vec<VideoRecord>),
    /// The job has not finished successfully; the current status says why
    /// results aren't available.
    NotReady(JobStatus),
}

/// In-memory mapping from job id to job state.
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Job>>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new running job and returns its generated id.
    ///
    /// The job starts with `completed = 0` and `total` set to the
    /// requested maximum; `total` is refined once enumeration resolves.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    pub fn create_job(&self, channel_url: &str, requested_max: usize) -> String {
        let id = uuid::Uuid::new_v4().to_string();

        let job = Job {
            id: id.clone(),
            status: JobStatus::Running,
            total: requested_max,
            completed: 0,
            results: Vec::new(),
            error: None,
            created_at: chrono::Utc::now(),
            channel_url: channel_url.to_string(),
            requested_max,
        };

        self.jobs
            .write()
            .expect("job registry lock poisoned")
            .insert(id.clone(), job);

        log::info!("Created harvest job {id} for {channel_url} (max {requested_max})");
        id
    }

    /// Returns a point-in-time view of a job, or `None` if the id is
    /// unknown.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    #[must_use]
    pub fn snapshot(&self, job_id: &str) -> Option<JobSnapshot> {
        self.jobs
            .read()
            .expect("job registry lock poisoned")
            .get(job_id)
            .map(|job| JobSnapshot {
                status: job.status,
                completed: job.completed,
                total: job.total,
                error: job.error.clone(),
            })
    }

    /// Returns the job's results if it is done, the current status if not,
    /// or `None` if the id is unknown.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    #[must_use]
    pub fn results(&self, job_id: &str) -> Option<ResultsQuery> {
        self.jobs
            .read()
            .expect("job registry lock poisoned")
            .get(job_id)
            .map(|job| {
                if job.status == JobStatus::Done {
                    ResultsQuery::Ready(job.results.clone())
                } else {
                    ResultsQuery::NotReady(job.status)
                }
            })
    }

    /// Advances a running job's progress counters. Writer-only.
    ///
    /// Ignored (with a warning) if the job is unknown or already terminal.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    pub fn record_progress(&self, job_id: &str, completed: usize, total: usize) {
        let mut jobs = self.jobs.write().expect("job registry lock poisoned");
        match jobs.get_mut(job_id) {
            Some(job) if job.status == JobStatus::Running => {
                job.completed = completed;
                job.total = total;
            }
            Some(job) => {
                log::warn!(
                    "Ignoring progress for job {job_id} in terminal state {}",
                    job.status
                );
            }
            None => log::warn!("Ignoring progress for unknown job {job_id}"),
        }
    }

    /// Marks a running job done with its final results. Writer-only.
    ///
    /// Sets `completed` and `total` to the result count. Ignored (with a
    /// warning) if the job is unknown or already terminal — a job leaves
    /// `running` exactly once.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    pub fn complete(&self, job_id: &str, results: Vec<VideoRecord>) {
        let mut jobs = self.jobs.write().expect("job registry lock poisoned");
        match jobs.get_mut(job_id) {
            Some(job) if job.status == JobStatus::Running => {
                job.completed = results.len();
                job.total = results.len();
                job.results = results;
                job.status = JobStatus::Done;
                log::info!("Harvest job {job_id} done ({} videos)", job.total);
            }
            Some(job) => {
                log::warn!(
                    "Ignoring completion for job {job_id} in terminal state {}",
                    job.status
                );
            }
            None => log::warn!("Ignoring completion for unknown job {job_id}"),
        }
    }

    /// Marks a running job failed. Writer-only.
    ///
    /// Ignored (with a warning) if the job is unknown or already terminal.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    pub fn fail(&self, job_id: &str, message: String) {
        let mut jobs = self.jobs.write().expect("job registry lock poisoned");
        match jobs.get_mut(job_id) {
            Some(job) if job.status == JobStatus::Running => {
                log::error!("Harvest job {job_id} failed: {message}");
                job.error = Some(message);
                job.status = JobStatus::Error;
            }
            Some(job) => {
                log::warn!(
                    "Ignoring failure for job {job_id} in terminal state {}",
                    job.status
                );
            }
            None => log::warn!("Ignoring failure for unknown job {job_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(id: &str) -> VideoRecord {
        let mut record = VideoRecord::failed(id, String::new());
        record.error = None;
        record.title = format!("title {id}");
        record
    }

    #[test]
    fn create_starts_running_with_requested_total() {
        let registry = JobRegistry::new();
        let id = registry.create_job("https://example.com/@handle", 5);

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.completed, 0);
        assert_eq!(snapshot.total, 5);
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn ids_are_unique() {
        let registry = JobRegistry::new();
        let a = registry.create_job("https://example.com/@a", 1);
        let b = registry.create_job("https://example.com/@a", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_ids_query_as_none() {
        let registry = JobRegistry::new();
        assert!(registry.snapshot("nope").is_none());
        assert!(registry.results("nope").is_none());
    }

    #[test]
    fn progress_refines_total_and_advances_completed() {
        let registry = JobRegistry::new();
        let id = registry.create_job("https://example.com/@handle", 10);

        registry.record_progress(&id, 1, 3);
        registry.record_progress(&id, 2, 3);

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.total, 3);
    }

    #[test]
    fn results_not_ready_while_running_and_after_failure() {
        let registry = JobRegistry::new();
        let id = registry.create_job("https://example.com/@handle", 2);

        assert!(matches!(
            registry.results(&id),
            Some(ResultsQuery::NotReady(JobStatus::Running))
        ));

        registry.fail(&id, "listing failed".to_string());
        assert!(matches!(
            registry.results(&id),
            Some(ResultsQuery::NotReady(JobStatus::Error))
        ));
    }

    #[test]
    fn complete_sets_terminal_counts_and_results() {
        let registry = JobRegistry::new();
        let id = registry.create_job("https://example.com/@handle", 10);

        registry.complete(&id, vec![sample_record("a"), sample_record("b")]);

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Done);
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.total, 2);

        let Some(ResultsQuery::Ready(results)) = registry.results(&id) else {
            panic!("expected ready results");
        };
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].video_id, "a");
    }

    #[test]
    fn terminal_queries_are_idempotent() {
        let registry = JobRegistry::new();
        let id = registry.create_job("https://example.com/@handle", 1);
        registry.complete(&id, vec![sample_record("a")]);

        let first = registry.snapshot(&id).unwrap();
        let second = registry.snapshot(&id).unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.completed, second.completed);

        let Some(ResultsQuery::Ready(r1)) = registry.results(&id) else {
            panic!("expected ready results");
        };
        let Some(ResultsQuery::Ready(r2)) = registry.results(&id) else {
            panic!("expected ready results");
        };
        assert_eq!(r1, r2);
    }

    #[test]
    fn terminal_states_never_transition_again() {
        let registry = JobRegistry::new();
        let id = registry.create_job("https://example.com/@handle", 1);

        registry.fail(&id, "first failure".to_string());
        registry.complete(&id, vec![sample_record("a")]);
        registry.record_progress(&id, 5, 5);
        registry.fail(&id, "second failure".to_string());

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert_eq!(snapshot.error.as_deref(), Some("first failure"));
        assert_eq!(snapshot.completed, 0);
    }
}
