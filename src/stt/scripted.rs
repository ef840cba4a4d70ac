use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::adapter::{SpeechEvent, SpeechRecognizer};

/// One timed emission in a scripted listening segment.
#[derive(Debug, Clone)]
pub struct ScriptedSegment {
    /// Delay before this event is emitted, relative to the previous one.
    pub after_ms: u64,
    pub event: SpeechEvent,
}

/// Everything one `start()` call will emit before going quiet.
#[derive(Debug, Clone, Default)]
pub struct ScriptedUtterance {
    pub segments: Vec<ScriptedSegment>,
}

impl ScriptedUtterance {
    /// A listening segment that stays silent.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Convenience: a short interim guess followed by one finalized text.
    pub fn spoken(text: &str) -> Self {
        Self {
            segments: vec![
                ScriptedSegment {
                    after_ms: 100,
                    event: SpeechEvent::interim(text),
                },
                ScriptedSegment {
                    after_ms: 200,
                    event: SpeechEvent::finalized(text),
                },
            ],
        }
    }
}

/// Recognizer that replays a prepared script, one utterance per `start()`.
///
/// Test and demo backend; once the script runs out, further starts succeed
/// but emit nothing.
pub struct ScriptedRecognizer {
    script: VecDeque<ScriptedUtterance>,
    task: Option<JoinHandle<()>>,
    listening: bool,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<ScriptedUtterance>) -> Self {
        Self {
            script: script.into(),
            task: None,
            listening: false,
        }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn start(&mut self) -> Result<mpsc::Receiver<SpeechEvent>> {
        if self.listening {
            anyhow::bail!("scripted recognizer started while already listening");
        }

        let (tx, rx) = mpsc::channel(16);
        let utterance = self.script.pop_front().unwrap_or_default();

        self.task = Some(tokio::spawn(async move {
            for seg in utterance.segments {
                tokio::time::sleep(Duration::from_millis(seg.after_ms)).await;
                if tx.send(seg.event).await.is_err() {
                    debug!("scripted event dropped, receiver gone");
                    return;
                }
            }
        }));
        self.listening = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.listening = false;
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.listening
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
