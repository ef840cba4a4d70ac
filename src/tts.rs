//! Prompt playback seam.
//!
//! Speech synthesis itself is platform-supplied; the engine only needs a way
//! to hand a prompt line to whatever plays it. The default implementation
//! logs the line instead of producing audio.

use anyhow::Result;
use tracing::info;

#[async_trait::async_trait]
pub trait Speaker: Send + Sync {
    /// Speak one prompt line. Resolves when playback has been handed off.
    async fn say(&self, line: &str) -> Result<()>;
}

/// Speaker that logs prompts through `tracing` instead of playing audio.
pub struct TracingSpeaker;

#[async_trait::async_trait]
impl Speaker for TracingSpeaker {
    async fn say(&self, line: &str) -> Result<()> {
        info!("tts: {}", line);
        Ok(())
    }
}
