//! HTTP handlers and driver for the channel harvest job surface.
//!
//! `POST /api/channel/jobs` answers immediately with the new job id, then
//! the harvest runs as a detached task (the "driver"). The driver is the
//! only writer of its job's registry entry: it forwards every per-video
//! progress callback into the registry and the broadcaster, writes the
//! terminal state, and closes all subscriber streams. A driver failure is
//! routed into the registry's error path — never silently dropped.

use std::convert::Infallible;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use channel_scope_harvest::orchestrator::run_channel_harvest;
use channel_scope_harvest::progress::{HarvestObserver, UnitProgress};
use channel_scope_harvest::{clamp_max_videos, ChannelSource};
use channel_scope_jobs::{JobEvent, JobRegistry, ProgressBroadcaster, ResultsQuery};
use channel_scope_server_models::{
    ApiErrorBody, CreateHarvestRequest, CreateHarvestResponse, HarvestStatusResponse,
};
use tokio::sync::mpsc;

use crate::AppState;

/// Forwards orchestrator progress into the job registry and the event
/// stream. One instance per running driver; the sole writer of its job.
struct RegistryObserver {
    registry: Arc<JobRegistry>,
    broadcaster: Arc<ProgressBroadcaster>,
    job_id: String,
}

impl HarvestObserver for RegistryObserver {
    fn unit_complete(&self, progress: UnitProgress<'_>) {
        self.registry
            .record_progress(&self.job_id, progress.completed, progress.total);
        self.broadcaster.publish(
            &self.job_id,
            &JobEvent::Progress {
                completed: progress.completed,
                total: progress.total,
                video_id: progress.video_id.to_string(),
                error: progress.error.map(String::from),
                record: progress.record.cloned(),
            },
        );
    }
}

/// Runs one harvest to completion and settles its job.
async fn drive_harvest(
    registry: Arc<JobRegistry>,
    broadcaster: Arc<ProgressBroadcaster>,
    source: Arc<dyn ChannelSource>,
    job_id: String,
    channel_url: String,
    max: usize,
) {
    if let Some(snapshot) = registry.snapshot(&job_id) {
        broadcaster.publish(&job_id, &JobEvent::status_of(&snapshot));
    }

    let observer = RegistryObserver {
        registry: Arc::clone(&registry),
        broadcaster: Arc::clone(&broadcaster),
        job_id: job_id.clone(),
    };

    match run_channel_harvest(source.as_ref(), &channel_url, max, &observer).await {
        Ok(outcome) => {
            let total = outcome.total;
            registry.complete(&job_id, outcome.results);
            broadcaster.publish(
                &job_id,
                &JobEvent::Done {
                    job_id: job_id.clone(),
                    total,
                },
            );
        }
        Err(e) => {
            let message = e.to_string();
            registry.fail(&job_id, message.clone());
            broadcaster.publish(&job_id, &JobEvent::Error { error: message });
        }
    }

    broadcaster.close_all(&job_id);
}

/// Interprets the loosely-typed `maxVideos` field: valid numbers clamp
/// into range, anything else falls back to the default.
fn requested_max(value: Option<&serde_json::Value>) -> usize {
    let parsed = value
        .and_then(serde_json::Value::as_u64)
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX));
    clamp_max_videos(parsed)
}

/// `POST /api/channel/jobs`
///
/// Validates the request, registers a running job, answers with the job
/// id, and spawns the driver. The response never waits for the harvest.
#[allow(clippy::future_not_send)]
pub async fn create_job(
    state: web::Data<AppState>,
    body: web::Json<CreateHarvestRequest>,
) -> HttpResponse {
    let Some(channel_url) = body
        .channel_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
    else {
        return HttpResponse::BadRequest().json(ApiErrorBody {
            error: "channelUrl is required".to_string(),
        });
    };

    let max = requested_max(body.max_videos.as_ref());
    let job_id = state.registry.create_job(&channel_url, max);

    actix_web::rt::spawn(drive_harvest(
        Arc::clone(&state.registry),
        Arc::clone(&state.broadcaster),
        Arc::clone(&state.source),
        job_id.clone(),
        channel_url,
        max,
    ));

    HttpResponse::Ok().json(CreateHarvestResponse {
        ok: true,
        job_id,
        max_videos: max,
    })
}

/// Builds one SSE frame for a job event.
fn job_frame(event: &JobEvent) -> web::Bytes {
    web::Bytes::from(format!(
        "event: {}\ndata: {}\n\n",
        event.kind(),
        event.payload()
    ))
}

/// `GET /api/channel/jobs/{id}/events`
///
/// Attaches to a job's live progress stream. The subscriber first
/// receives a `status` replay of current state, then live `progress`
/// events, then exactly one terminal `done`/`error` event, after which
/// the stream ends. An unknown id yields one `error` event and the
/// stream ends immediately.
#[allow(clippy::future_not_send)]
pub async fn job_events(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let job_id = path.into_inner();

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.broadcaster.attach(&state.registry, &job_id, tx);

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok::<_, Infallible>(job_frame(&event));
        }
    };

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream)
}

/// `GET /api/channel/jobs/{id}/status`
pub async fn job_status(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let job_id = path.into_inner();

    state.registry.snapshot(&job_id).map_or_else(
        || {
            HttpResponse::NotFound().json(ApiErrorBody {
                error: format!("unknown job id: {job_id}"),
            })
        },
        |snapshot| {
            HttpResponse::Ok().json(HarvestStatusResponse {
                status: snapshot.status,
                completed: snapshot.completed,
                total: snapshot.total,
                error: snapshot.error,
            })
        },
    )
}

/// `GET /api/channel/jobs/{id}/results`
///
/// Returns the ordered per-video records once the job is done; before
/// that, a 400 naming the current status.
pub async fn job_results(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let job_id = path.into_inner();

    match state.registry.results(&job_id) {
        Some(ResultsQuery::Ready(results)) => HttpResponse::Ok().json(results),
        Some(ResultsQuery::NotReady(status)) => HttpResponse::BadRequest().json(ApiErrorBody {
            error: format!("results not available: job is {status}"),
        }),
        None => HttpResponse::NotFound().json(ApiErrorBody {
            error: format!("unknown job id: {job_id}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_max_clamps_numbers_and_defaults_garbage() {
        assert_eq!(requested_max(None), 10);
        assert_eq!(requested_max(Some(&serde_json::json!(5))), 5);
        assert_eq!(requested_max(Some(&serde_json::json!(0))), 10);
        assert_eq!(requested_max(Some(&serde_json::json!(500))), 100);
        assert_eq!(requested_max(Some(&serde_json::json!(-3))), 10);
        assert_eq!(requested_max(Some(&serde_json::json!("lots"))), 10);
        assert_eq!(requested_max(Some(&serde_json::json!(2.5))), 10);
        assert_eq!(requested_max(Some(&serde_json::json!(null))), 10);
    }
}
