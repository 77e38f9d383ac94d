#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the channel scope server.
//!
//! These types are serialized to JSON for the REST API. Field names are
//! camelCase. Harvested video records returned by the results endpoint
//! keep their own stable snake_case shape and are not redefined here.

use channel_scope_jobs::JobStatus;
use serde::{Deserialize, Serialize};

/// Request body for starting a channel harvest job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHarvestRequest {
    /// The channel to harvest.
    pub channel_url: Option<String>,
    /// Maximum number of videos to harvest (clamped to 1-100, default 10).
    pub max_videos: Option<serde_json::Value>,
}

/// Response body for a created harvest job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHarvestResponse {
    /// Always `true` on the success path.
    pub ok: bool,
    /// The new job's id, for polling and stream attachment.
    pub job_id: String,
    /// The effective (clamped) maximum video count.
    pub max_videos: usize,
}

/// Point-in-time job status as returned by the polling endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestStatusResponse {
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Videos processed so far.
    pub completed: usize,
    /// Expected video count.
    pub total: usize,
    /// Fatal error message, when the job aborted.
    pub error: Option<String>,
}

/// Request body for the AI ask endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    /// The user's question.
    pub question: String,
    /// Conversation to resume; omitted for a fresh conversation.
    pub conversation_id: Option<String>,
}

/// Query parameters for the chat list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatListQuery {
    /// Maximum number of sessions to return (default 20, capped at 100).
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

/// Summary of a stored chat session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChatSummary {
    /// Conversation UUID.
    pub id: String,
    /// Title (first user question, truncated).
    pub title: Option<String>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last update timestamp (RFC 3339).
    pub updated_at: String,
    /// Total number of messages.
    pub message_count: i64,
}

/// A stored chat message as returned by the chat detail endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChatMessage {
    /// Ordering within the conversation.
    pub sequence: i32,
    /// Role: "user" or "assistant".
    pub role: String,
    /// The message content (as stored, JSON-encoded blocks or text).
    pub content: String,
    /// When this message was stored.
    pub created_at: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Generic error body for non-2xx responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Human-readable error message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_loose_max_videos() {
        // maxVideos arrives as whatever JSON the client sent; the handler
        // interprets it. Both numbers and garbage must deserialize.
        let with_number: CreateHarvestRequest =
            serde_json::from_str(r#"{"channelUrl":"https://example.com/@c","maxVideos":5}"#)
                .unwrap();
        assert_eq!(with_number.channel_url.as_deref(), Some("https://example.com/@c"));
        assert_eq!(with_number.max_videos, Some(serde_json::json!(5)));

        let with_garbage: CreateHarvestRequest =
            serde_json::from_str(r#"{"channelUrl":"x","maxVideos":"lots"}"#).unwrap();
        assert_eq!(with_garbage.max_videos, Some(serde_json::json!("lots")));

        let without: CreateHarvestRequest = serde_json::from_str(r#"{"channelUrl":"x"}"#).unwrap();
        assert!(without.max_videos.is_none());
    }

    #[test]
    fn status_response_serializes_camel_case() {
        let response = HarvestStatusResponse {
            status: JobStatus::Running,
            completed: 2,
            total: 5,
            error: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["completed"], 2);
        assert!(json["error"].is_null());
    }
}
