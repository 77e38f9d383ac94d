//! Tool definitions for the video agent.
//!
//! Each tool is described by a JSON-schema definition handed to the LLM
//! provider, plus a typed parameter struct the agent deserializes tool
//! calls into before dispatching them.

use serde::Deserialize;

/// Parameters for the `fetch_video` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchVideoParams {
    /// A video URL or bare video id.
    pub video: String,
}

/// Parameters for the `list_channel_videos` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ListChannelVideosParams {
    /// Channel URL (handle, /channel/ or /c/ forms all work).
    pub channel_url: String,
    /// Maximum number of videos to list.
    pub max: Option<usize>,
}

/// Parameters for the `generate_image` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateImageParams {
    /// Text prompt describing the image.
    pub prompt: String,
}

/// Returns the tool definitions advertised to the LLM.
#[must_use]
pub fn tool_definitions() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({
            "name": "fetch_video",
            "description": "Fetch full metadata (title, description, stats, release date) \
                            and transcript for a single video, given its URL or id.",
            "parameters": {
                "type": "object",
                "properties": {
                    "video": {
                        "type": "string",
                        "description": "Video URL or bare video id",
                    },
                },
                "required": ["video"],
            },
        }),
        serde_json::json!({
            "name": "list_channel_videos",
            "description": "List the most recent video ids of a channel, newest first.",
            "parameters": {
                "type": "object",
                "properties": {
                    "channel_url": {
                        "type": "string",
                        "description": "Channel URL",
                    },
                    "max": {
                        "type": "integer",
                        "description": "Maximum videos to list (1-100, default 10)",
                    },
                },
                "required": ["channel_url"],
            },
        }),
        serde_json::json!({
            "name": "generate_image",
            "description": "Generate an image from a text prompt and show it to the user.",
            "parameters": {
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "What the image should depict",
                    },
                },
                "required": ["prompt"],
            },
        }),
    ]
}

/// Extracts a bare video id from a watch URL, short URL, or raw id.
#[must_use]
pub fn extract_video_id(input: &str) -> String {
    let trimmed = input.trim();

    if let Some(rest) = trimmed.split("watch?v=").nth(1) {
        return rest
            .split(['&', '#'])
            .next()
            .unwrap_or(rest)
            .to_string();
    }

    if let Some(rest) = trimmed.split("youtu.be/").nth(1) {
        return rest
            .split(['?', '&', '#'])
            .next()
            .unwrap_or(rest)
            .to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=abc123&t=10s"),
            "abc123"
        );
    }

    #[test]
    fn extracts_id_from_short_url() {
        assert_eq!(extract_video_id("https://youtu.be/abc123?si=xyz"), "abc123");
    }

    #[test]
    fn passes_bare_ids_through() {
        assert_eq!(extract_video_id("  abc123 "), "abc123");
    }

    #[test]
    fn tool_names_are_unique_and_schema_complete() {
        let defs = tool_definitions();
        let mut names: Vec<&str> = defs
            .iter()
            .map(|d| d["name"].as_str().expect("tool has a name"))
            .collect();
        names.sort_unstable();
        let len = names.len();
        names.dedup();
        assert_eq!(names.len(), len);

        for def in &defs {
            assert!(def["description"].is_string());
            assert_eq!(def["parameters"]["type"], "object");
        }
    }
}
