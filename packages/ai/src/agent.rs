//! Agent loop orchestration.
//!
//! Implements the agentic tool-use loop: user question -> LLM decides
//! tools -> execute tools against the harvest layer -> feed results back
//! -> repeat until final answer.

use channel_scope_harvest::{clamp_max_videos, ChannelSource};
use tokio::sync::mpsc;

use crate::providers::{ContentBlock, LlmProvider, Message, MessageContent, StopReason};
use crate::tools::{
    extract_video_id, tool_definitions, FetchVideoParams, GenerateImageParams,
    ListChannelVideosParams,
};
use crate::{AgentEvent, AgentOutcome, AiError};

/// Maximum number of agent loop iterations to prevent infinite loops.
const MAX_ITERATIONS: u32 = 10;

/// Maximum size of a tool result JSON string before truncation.
/// Prevents overwhelming the LLM context window.
const MAX_TOOL_RESULT_BYTES: usize = 8000;

/// System prompt for the video analyst agent.
fn build_system_prompt() -> String {
    format!(
        r#"You are a video research assistant for a channel analysis application. You help users explore videos and channels: what a video covers, what a creator publishes, how videos perform.

## Instructions
1. Use the tools provided to look up real video data. Do NOT make up titles, statistics, or quotes.
2. For questions about a specific video, call fetch_video with its URL or id. The result includes the transcript when captions exist — quote from it when summarizing content.
3. For questions about a channel, call list_channel_videos first, then fetch individual videos as needed.
4. Use generate_image only when the user explicitly asks for an image.
5. Cite concrete numbers (views, likes, duration, release date) from tool results.
6. If a tool reports an error for a video, say so plainly rather than guessing.
7. Today's date is {today}. Interpret "this year", "recent", etc. relative to today.
8. Format your final answer in clear markdown.

Be concise but thorough."#,
        today = chrono::Utc::now().format("%Y-%m-%d"),
    )
}

/// Runs the AI agent loop for a user question.
///
/// `history` carries the prior messages of a resumed conversation (empty
/// for a fresh one). Sends [`AgentEvent`]s through the provided channel as
/// the agent works; the final event is either `AgentEvent::Answer` or
/// `AgentEvent::Error` (emitted by the caller from the returned outcome).
///
/// Always returns an [`AgentOutcome`] carrying the accumulated messages so
/// the caller can persist the conversation even on failure.
pub async fn run_agent(
    provider: &dyn LlmProvider,
    source: &dyn ChannelSource,
    history: Vec<Message>,
    question: &str,
    tx: mpsc::Sender<AgentEvent>,
) -> AgentOutcome {
    let mut messages = history;
    messages.push(Message {
        role: "user".to_string(),
        content: MessageContent::Text(question.to_string()),
    });

    let result = drive_loop(provider, source, &mut messages, &tx).await;

    AgentOutcome { messages, result }
}

/// The iteration loop proper, mutating `messages` in place.
async fn drive_loop(
    provider: &dyn LlmProvider,
    source: &dyn ChannelSource,
    messages: &mut Vec<Message>,
    tx: &mpsc::Sender<AgentEvent>,
) -> Result<(), AiError> {
    let system_prompt = build_system_prompt();
    let tools = tool_definitions();

    for iteration in 0..MAX_ITERATIONS {
        log::info!("Agent iteration {iteration}");

        let _ = tx
            .send(AgentEvent::Thinking {
                message: if iteration == 0 {
                    "Analyzing your question...".to_string()
                } else {
                    "Processing results and thinking...".to_string()
                },
            })
            .await;

        let response = provider.chat(&system_prompt, messages, &tools).await?;

        if response.stop_reason != StopReason::ToolUse {
            // Model is done — extract final answer
            let text = extract_text(&response.content);
            let _ = tx.send(AgentEvent::Answer { text }).await;
            return Ok(());
        }

        if !response
            .content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
        {
            // No actual tool calls despite stop_reason — treat as final answer
            let text = extract_text(&response.content);
            let _ = tx.send(AgentEvent::Answer { text }).await;
            return Ok(());
        }

        // Add assistant message with all content blocks
        messages.push(Message {
            role: "assistant".to_string(),
            content: MessageContent::Blocks(response.content.clone()),
        });

        // Execute each tool and collect results
        let mut tool_results = Vec::new();

        for block in &response.content {
            if let ContentBlock::ToolUse { id, name, input } = block {
                let _ = tx
                    .send(AgentEvent::ToolCall {
                        tool: name.clone(),
                        params: input.clone(),
                    })
                    .await;

                let result = execute_tool(provider, source, tx, name.as_str(), input).await;

                let (summary, result_json) = match &result {
                    Ok(json) => {
                        let summary = summarize_tool_result(name, json);
                        let raw = json.to_string();
                        // Truncate large results to avoid overwhelming the LLM
                        let truncated = if raw.len() > MAX_TOOL_RESULT_BYTES {
                            let cut = &raw[..MAX_TOOL_RESULT_BYTES];
                            format!("{cut}... (truncated, {summary})")
                        } else {
                            raw
                        };
                        (summary, truncated)
                    }
                    Err(e) => {
                        let msg = format!("Tool error: {e}");
                        (msg.clone(), msg)
                    }
                };

                let _ = tx
                    .send(AgentEvent::ToolResult {
                        tool: name.clone(),
                        summary,
                    })
                    .await;

                tool_results.push(ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: result_json,
                });
            }
        }

        // Add tool results as a user message
        messages.push(Message {
            role: "user".to_string(),
            content: MessageContent::Blocks(tool_results),
        });
    }

    Err(AiError::MaxIterations {
        max_iterations: MAX_ITERATIONS,
    })
}

/// Extracts text content from content blocks.
fn extract_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|b| {
            if let ContentBlock::Text { text } = b {
                Some(text.as_str())
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Executes a single tool by name with the given parameters.
async fn execute_tool(
    provider: &dyn LlmProvider,
    source: &dyn ChannelSource,
    tx: &mpsc::Sender<AgentEvent>,
    name: &str,
    input: &serde_json::Value,
) -> Result<serde_json::Value, AiError> {
    match name {
        "fetch_video" => {
            let params: FetchVideoParams = serde_json::from_value(input.clone())?;
            let video_id = extract_video_id(&params.video);
            let record = source.fetch_video(&video_id).await?;
            Ok(serde_json::to_value(record).unwrap_or_default())
        }
        "list_channel_videos" => {
            let params: ListChannelVideosParams = serde_json::from_value(input.clone())?;
            let max = clamp_max_videos(params.max);
            let ids = source.list_videos(&params.channel_url, max).await?;
            Ok(serde_json::json!({ "video_ids": ids }))
        }
        "generate_image" => {
            let params: GenerateImageParams = serde_json::from_value(input.clone())?;
            let image = provider.generate_image(&params.prompt).await?;
            let _ = tx
                .send(AgentEvent::Image {
                    url: image.url,
                    prompt: params.prompt.clone(),
                })
                .await;
            Ok(serde_json::json!({
                "status": "image generated and shown to the user",
            }))
        }
        other => Err(AiError::Provider {
            message: format!("Unknown tool: {other}"),
        }),
    }
}

/// Creates a brief human-readable summary of a tool result.
fn summarize_tool_result(tool_name: &str, result: &serde_json::Value) -> String {
    match tool_name {
        "fetch_video" => {
            let title = result["title"].as_str().unwrap_or("(unknown title)");
            let has_transcript = result["transcript"].is_string();
            if has_transcript {
                format!("Fetched \"{title}\" with transcript")
            } else {
                format!("Fetched \"{title}\" (no transcript)")
            }
        }
        "list_channel_videos" => {
            let count = result["video_ids"].as_array().map_or(0, Vec::len);
            format!("Listed {count} video(s)")
        }
        "generate_image" => "Image generated".to_string(),
        _ => "Result received".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_reflect_result_shape() {
        let with_transcript = serde_json::json!({
            "title": "Deep dive",
            "transcript": "words",
        });
        assert_eq!(
            summarize_tool_result("fetch_video", &with_transcript),
            "Fetched \"Deep dive\" with transcript"
        );

        let listing = serde_json::json!({ "video_ids": ["a", "b"] });
        assert_eq!(
            summarize_tool_result("list_channel_videos", &listing),
            "Listed 2 video(s)"
        );
    }

    #[test]
    fn extract_text_joins_only_text_blocks() {
        let blocks = vec![
            ContentBlock::Text {
                text: "one".to_string(),
            },
            ContentBlock::ToolUse {
                id: "t1".to_string(),
                name: "fetch_video".to_string(),
                input: serde_json::json!({}),
            },
            ContentBlock::Text {
                text: "two".to_string(),
            },
        ];
        assert_eq!(extract_text(&blocks), "one\ntwo");
    }
}
