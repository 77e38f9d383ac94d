//! HTTP handler functions for the chat and AI surfaces.

use std::convert::Infallible;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use channel_scope_ai::{agent, AgentEvent};
use channel_scope_conversations::{
    delete_conversation, get_conversation_messages, list_conversations, load_messages,
    save_conversation,
};
use channel_scope_server_models::{
    ApiChatMessage, ApiChatSummary, ApiErrorBody, ApiHealth, AskRequest, ChatListQuery,
};
use tokio::sync::mpsc;

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Builds one SSE frame for an agent event.
///
/// Agent events self-describe through their `type` tag, so frames carry
/// only a `data:` field.
fn agent_frame(event: &AgentEvent) -> web::Bytes {
    let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    web::Bytes::from(format!("data: {json}\n\n"))
}

/// `POST /api/ai/ask`
///
/// Streams [`AgentEvent`]s over SSE while the agent answers the question.
/// The first event carries the conversation id; the conversation (including
/// any tool calls) is persisted when the agent finishes, successfully or
/// not.
#[allow(clippy::future_not_send)]
pub async fn ai_ask(state: web::Data<AppState>, body: web::Json<AskRequest>) -> HttpResponse {
    let question = body.question.trim().to_string();
    if question.is_empty() {
        return HttpResponse::BadRequest().json(ApiErrorBody {
            error: "question is required".to_string(),
        });
    }

    let conversation_id = body
        .conversation_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // Resuming an unknown id just starts a fresh conversation under it.
    let history = match &body.conversation_id {
        Some(id) => match load_messages(state.conversations_db.as_ref(), id).await {
            Ok(Some(messages)) => messages,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::error!("Failed to load conversation {id}: {e}");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let (tx, mut rx) = mpsc::channel::<AgentEvent>(32);

    let provider = Arc::clone(&state.provider);
    let source = Arc::clone(&state.source);
    let db = Arc::clone(&state.conversations_db);
    let conv_id = conversation_id.clone();

    actix_web::rt::spawn(async move {
        let _ = tx
            .send(AgentEvent::ConversationId { id: conv_id.clone() })
            .await;

        let outcome = agent::run_agent(
            provider.as_ref(),
            source.as_ref(),
            history,
            &question,
            tx.clone(),
        )
        .await;

        if let Err(e) = &outcome.result {
            log::error!("Agent run failed for conversation {conv_id}: {e}");
            let _ = tx
                .send(AgentEvent::Error {
                    message: e.to_string(),
                })
                .await;
        }

        if let Err(e) = save_conversation(db.as_ref(), &conv_id, &outcome.messages).await {
            log::error!("Failed to save conversation {conv_id}: {e}");
        }
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok::<_, Infallible>(agent_frame(&event));
        }
    };

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream)
}

/// `GET /api/chats`
///
/// Lists stored chat sessions, most recently updated first.
pub async fn list_chats(
    state: web::Data<AppState>,
    query: web::Query<ChatListQuery>,
) -> HttpResponse {
    let limit = query.limit.unwrap_or(20).min(100);
    let offset = query.offset.unwrap_or(0);

    match list_conversations(state.conversations_db.as_ref(), limit, offset).await {
        Ok(summaries) => {
            let chats: Vec<ApiChatSummary> = summaries
                .into_iter()
                .map(|s| ApiChatSummary {
                    id: s.id,
                    title: s.title,
                    created_at: s.created_at,
                    updated_at: s.updated_at,
                    message_count: s.message_count,
                })
                .collect();
            HttpResponse::Ok().json(chats)
        }
        Err(e) => {
            log::error!("Failed to list chat sessions: {e}");
            HttpResponse::InternalServerError().json(ApiErrorBody {
                error: "Failed to list chat sessions".to_string(),
            })
        }
    }
}

/// `GET /api/chats/{id}`
///
/// Returns a chat session's stored messages in order.
pub async fn get_chat(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();

    match get_conversation_messages(state.conversations_db.as_ref(), &id).await {
        Ok(Some(messages)) => {
            let messages: Vec<ApiChatMessage> = messages
                .into_iter()
                .map(|m| ApiChatMessage {
                    sequence: m.sequence,
                    role: m.role,
                    content: m.content,
                    created_at: m.created_at,
                })
                .collect();
            HttpResponse::Ok().json(messages)
        }
        Ok(None) => HttpResponse::NotFound().json(ApiErrorBody {
            error: format!("unknown chat session: {id}"),
        }),
        Err(e) => {
            log::error!("Failed to load chat session {id}: {e}");
            HttpResponse::InternalServerError().json(ApiErrorBody {
                error: "Failed to load chat session".to_string(),
            })
        }
    }
}

/// `DELETE /api/chats/{id}`
pub async fn delete_chat(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();

    match delete_conversation(state.conversations_db.as_ref(), &id).await {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({ "ok": true })),
        Ok(false) => HttpResponse::NotFound().json(ApiErrorBody {
            error: format!("unknown chat session: {id}"),
        }),
        Err(e) => {
            log::error!("Failed to delete chat session {id}: {e}");
            HttpResponse::InternalServerError().json(ApiErrorBody {
                error: "Failed to delete chat session".to_string(),
            })
        }
    }
}
