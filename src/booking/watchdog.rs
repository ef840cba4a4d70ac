use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Single-shot, resettable silence timer.
///
/// `reset()` re-arms the timer; only the deadline of the last reset
/// matters. On expiry the current generation number is sent once on the
/// channel supplied at construction. A fire can race with a reset that
/// supersedes it, so consumers must discard fires whose generation is no
/// longer current (`is_current`).
pub struct SilenceWatchdog {
    window: Duration,
    tx: mpsc::Sender<u64>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl SilenceWatchdog {
    pub fn new(window: Duration, tx: mpsc::Sender<u64>) -> Self {
        Self {
            window,
            tx,
            generation: 0,
            task: None,
        }
    }

    /// Clear any pending timer and start a fresh one.
    pub fn reset(&mut self) {
        self.disarm();
        self.generation += 1;

        let generation = self.generation;
        let window = self.window;
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if tx.send(generation).await.is_err() {
                debug!("silence fire dropped, session gone");
            }
        }));
    }

    /// Stop the timer without firing.
    pub fn cancel(&mut self) {
        self.disarm();
        self.generation += 1;
    }

    /// Whether a received fire belongs to the latest arm.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SilenceWatchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}
