use anyhow::Result;
use tokio::sync::mpsc;

/// One emission from a continuous recognizer.
///
/// `final_text` is non-empty only when a recognized segment has just been
/// finalized; `interim_text` is the current in-progress guess and may be
/// empty. A single emission can carry both.
#[derive(Debug, Clone, Default)]
pub struct SpeechEvent {
    pub final_text: String,
    pub interim_text: String,
}

impl SpeechEvent {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            final_text: String::new(),
            interim_text: text.into(),
        }
    }

    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            final_text: text.into(),
            interim_text: String::new(),
        }
    }

    /// True when neither field carries speech.
    pub fn is_silent(&self) -> bool {
        self.final_text.trim().is_empty() && self.interim_text.trim().is_empty()
    }
}

/// Continuous, interim-capable speech recognizer.
///
/// Occupies an exclusive OS/hardware listening resource: only one instance
/// may be live per session, and callers must await `stop()` before starting
/// again. Restartable: `start` may be called again after `stop` resolves.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Begin listening.
    ///
    /// Returns a channel receiver that will receive speech events. Fails
    /// when the underlying capability is unavailable in this environment;
    /// that failure is recoverable for the caller (surface a message, stay
    /// open without listening).
    async fn start(&mut self) -> Result<mpsc::Receiver<SpeechEvent>>;

    /// Stop listening and release the underlying resource.
    async fn stop(&mut self) -> Result<()>;

    /// Whether the recognizer is currently listening.
    fn is_listening(&self) -> bool;

    /// Recognizer name for logging.
    fn name(&self) -> &str;
}

/// Creates one recognizer per booking session.
pub trait RecognizerProvider: Send + Sync {
    fn create(&self) -> Result<Box<dyn SpeechRecognizer>>;
}

/// Recognizer for environments without a speech capability.
///
/// `start` always fails, which the session surfaces as a user-facing
/// message while remaining open for manual actions.
pub struct UnsupportedRecognizer;

#[async_trait::async_trait]
impl SpeechRecognizer for UnsupportedRecognizer {
    async fn start(&mut self) -> Result<mpsc::Receiver<SpeechEvent>> {
        anyhow::bail!("speech recognition is not available in this environment")
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_listening(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unsupported"
    }
}

impl RecognizerProvider for UnsupportedRecognizer {
    fn create(&self) -> Result<Box<dyn SpeechRecognizer>> {
        Ok(Box::new(UnsupportedRecognizer))
    }
}
