//! Channel enumeration — resolving a channel URL into a flat list of
//! video ids.
//!
//! Channel landing pages enumerate sub-collections (featured tabs,
//! playlists, shorts), which would make the listing nested and unordered.
//! [`normalize_channel_url`] forces resolution to the flat `/videos` tab so
//! the listing is a plain ordered sequence of video entries.

use crate::ytdlp::YtDlpRunner;
use crate::HarvestError;

/// Tab suffixes that already produce a flat video listing.
const FLAT_TABS: &[&str] = &["/videos", "/streams", "/shorts"];

/// Normalizes a channel URL so `yt-dlp` enumerates the flat uploads
/// listing instead of the channel landing page.
///
/// Playlist and direct watch URLs are passed through untouched — they are
/// already flat.
#[must_use]
pub fn normalize_channel_url(channel_url: &str) -> String {
    let trimmed = channel_url.trim().trim_end_matches('/');

    if trimmed.contains("/playlist") || trimmed.contains("/watch") {
        return trimmed.to_string();
    }

    if FLAT_TABS.iter().any(|tab| trimmed.ends_with(tab)) {
        return trimmed.to_string();
    }

    format!("{trimmed}/videos")
}

/// Resolves a channel URL into up to `max` video ids, in listing order.
///
/// Uses `--flat-playlist` so `yt-dlp` lists entries without resolving each
/// video, and `--playlist-end` to bound the listing. Fewer than `max`
/// entries is not an error — small channels simply yield shorter lists.
///
/// # Errors
///
/// Returns [`HarvestError::Enumeration`] if the listing call fails or the
/// output contains no parseable entries.
pub async fn list_channel_videos(
    runner: &YtDlpRunner,
    channel_url: &str,
    max: usize,
) -> Result<Vec<String>, HarvestError> {
    let url = normalize_channel_url(channel_url);
    let end = max.to_string();

    let listing = runner
        .dump_json(&[
            "--flat-playlist",
            "--dump-single-json",
            "--playlist-end",
            &end,
            &url,
        ])
        .await
        .map_err(|e| HarvestError::Enumeration {
            message: format!("listing {url} failed: {e}"),
        })?;

    let ids = parse_listing(&listing, max);
    if ids.is_empty() {
        return Err(HarvestError::Enumeration {
            message: format!("no videos found at {url}"),
        });
    }

    log::info!("Enumerated {} video(s) from {url}", ids.len());
    Ok(ids)
}

/// Extracts up to `max` entry ids from a flat-playlist listing document.
fn parse_listing(listing: &serde_json::Value, max: usize) -> Vec<String> {
    listing["entries"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry["id"].as_str())
                .map(String::from)
                .take(max)
                .collect()
        })
        .unwrap_or_default()
}
