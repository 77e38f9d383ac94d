//! `yt-dlp` process runner.
//!
//! Every extractor call shells out to the `yt-dlp` binary and parses its
//! single-JSON stdout. The binary path comes from `YTDLP_BIN` (default
//! `yt-dlp`) so deployments can pin a vendored copy.

use tokio::process::Command;

use crate::HarvestError;

/// Maximum bytes of stderr included in a process error message.
const STDERR_PREVIEW_LEN: usize = 500;

/// Invokes the `yt-dlp` binary and parses its JSON output.
#[derive(Debug, Clone)]
pub struct YtDlpRunner {
    bin: String,
}

impl YtDlpRunner {
    /// Creates a runner for an explicit binary path.
    #[must_use]
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Creates a runner from `YTDLP_BIN`, defaulting to `yt-dlp` on `PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var("YTDLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string()))
    }

    /// Runs `yt-dlp` with the given arguments and parses stdout as one JSON
    /// document.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Process`] if the binary cannot be launched or
    /// exits non-zero, and [`HarvestError::Json`] if stdout is not valid
    /// JSON.
    pub async fn dump_json(&self, args: &[&str]) -> Result<serde_json::Value, HarvestError> {
        log::debug!("Running {} {}", self.bin, args.join(" "));

        let output = Command::new(&self.bin)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| HarvestError::Process {
                message: format!("failed to launch {}: {e}", self.bin),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let preview = if stderr.len() > STDERR_PREVIEW_LEN {
                format!("{}...", &stderr[..STDERR_PREVIEW_LEN])
            } else {
                stderr.to_string()
            };
            return Err(HarvestError::Process {
                message: format!("{} exited with {}: {}", self.bin, output.status, preview.trim()),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
