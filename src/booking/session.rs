use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::interpret::{self, Listen, StepInput, StepOutcome};
use super::phase::Phase;
use super::types::{ParkingSpaceDetail, ParkingSpaceListItem, ReservationResult};
use super::watchdog::SilenceWatchdog;
use crate::config::VoiceConfig;
use crate::gateway::BookingGateway;
use crate::stt::{SpeechEvent, SpeechRecognizer};
use crate::tts::Speaker;

/// Read-only view of a live session, cloned out for the presentation shell.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub user_id: i64,
    pub phase: Phase,
    pub listening: bool,
    /// A silence-triggered transition (remote call + restart) is in flight.
    pub busy: bool,
    /// Cleared on cancel; results arriving afterwards are discarded.
    pub active: bool,
    /// Finalized speech accumulated since the current segment began.
    pub final_text: String,
    /// Current in-progress recognition guess.
    pub interim_text: String,
    /// Latest user-facing status line (errors, re-prompts, confirmations).
    pub status: Option<String>,
    pub items: Vec<ParkingSpaceListItem>,
    pub detail: Option<ParkingSpaceDetail>,
    /// Reservation-time text, prefilled from the utterance or the first
    /// recommended slot and editable by the user.
    pub time_hint: String,
    /// The hint came from the user's own utterance; Time-phase silence may
    /// confirm it without further speech.
    pub time_hint_spoken: bool,
    pub reservation: Option<ReservationResult>,
    pub started_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// What the user should say right now.
    pub fn prompt(&self) -> &'static str {
        self.phase.prompt()
    }
}

/// Intent-equivalent actions the shell may dispatch. Each is the manual
/// counterpart of a voice event, never a direct state mutation.
#[derive(Debug)]
enum SessionCommand {
    /// Tap on list item N; equivalent to the ordinal N + 1.
    Select(usize),
    /// Type-in replacement for the reservation-time hint.
    SetTimeText(String),
    /// Confirm the current time hint; equivalent to Time-phase silence.
    Reserve,
    /// Reopen the flow after a completed reservation.
    BookAgain,
    Cancel,
}

/// A live voice-booking session.
///
/// Owns its recognizer and silence watchdog exclusively; all phase
/// transitions run on one driver task, so interpretations are strictly
/// serialized and no two remote calls ever overlap.
pub struct BookingSession {
    state: Arc<Mutex<SessionSnapshot>>,
    command_tx: mpsc::Sender<SessionCommand>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl BookingSession {
    /// Open a session and start listening. A recognizer that cannot start
    /// is recoverable: the session stays open, not listening, with a
    /// user-facing message.
    pub fn open(
        session_id: String,
        user_id: i64,
        voice: VoiceConfig,
        recognizer: Box<dyn SpeechRecognizer>,
        gateway: Arc<dyn BookingGateway>,
        speaker: Arc<dyn Speaker>,
    ) -> Self {
        info!("opening voice session {} for user {}", session_id, user_id);

        let state = Arc::new(Mutex::new(SessionSnapshot {
            session_id,
            user_id,
            phase: Phase::Address,
            listening: false,
            busy: false,
            active: true,
            final_text: String::new(),
            interim_text: String::new(),
            status: None,
            items: Vec::new(),
            detail: None,
            time_hint: String::new(),
            time_hint_spoken: false,
            reservation: None,
            started_at: Utc::now(),
        }));

        let (command_tx, command_rx) = mpsc::channel(16);
        let (silence_tx, silence_rx) = mpsc::channel(8);

        let driver = Driver {
            user_id,
            settle: Duration::from_millis(voice.restart_settle_ms),
            recognizer,
            gateway,
            speaker,
            state: Arc::clone(&state),
            watchdog: SilenceWatchdog::new(
                Duration::from_millis(voice.silence_window_ms),
                silence_tx,
            ),
            speech_rx: None,
            silence_rx,
            command_rx,
        };
        let handle = tokio::spawn(driver.run());

        Self {
            state,
            command_tx,
            driver: Mutex::new(Some(handle)),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.clone()
    }

    pub async fn select(&self, index: usize) -> Result<()> {
        self.send(SessionCommand::Select(index)).await
    }

    pub async fn set_time_text(&self, text: String) -> Result<()> {
        self.send(SessionCommand::SetTimeText(text)).await
    }

    pub async fn reserve(&self) -> Result<()> {
        self.send(SessionCommand::Reserve).await
    }

    pub async fn book_again(&self) -> Result<()> {
        self.send(SessionCommand::BookAgain).await
    }

    /// Cancel the session: recognition stops, the watchdog is cleared, and
    /// any in-flight remote result is discarded.
    pub async fn cancel(&self) {
        // Flip `active` before waking the driver so a response landing
        // mid-cancel is already stale.
        self.state.lock().await.active = false;

        if self.command_tx.send(SessionCommand::Cancel).await.is_err() {
            return; // driver already gone
        }
        let handle = self.driver.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("session driver panicked: {}", e);
            }
        }
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| anyhow!("session is closed"))
    }
}

enum Wake {
    Speech(Option<SpeechEvent>),
    Silence(u64),
    Command(Option<SessionCommand>),
}

/// Single-task event loop: speech events, watchdog fires, and shell
/// commands are serialized here.
struct Driver {
    user_id: i64,
    /// Settle pause between recognizer stop and the next start.
    settle: Duration,
    recognizer: Box<dyn SpeechRecognizer>,
    gateway: Arc<dyn BookingGateway>,
    speaker: Arc<dyn Speaker>,
    state: Arc<Mutex<SessionSnapshot>>,
    watchdog: SilenceWatchdog,
    speech_rx: Option<mpsc::Receiver<SpeechEvent>>,
    silence_rx: mpsc::Receiver<u64>,
    command_rx: mpsc::Receiver<SessionCommand>,
}

impl Driver {
    async fn run(mut self) {
        self.say(Phase::Address.prompt()).await;
        self.begin_listening().await;

        loop {
            let wake = {
                let speech_rx = &mut self.speech_rx;
                let silence_rx = &mut self.silence_rx;
                let command_rx = &mut self.command_rx;

                tokio::select! {
                    event = async {
                        match speech_rx.as_mut() {
                            Some(rx) => rx.recv().await,
                            None => std::future::pending().await,
                        }
                    } => Wake::Speech(event),
                    generation = silence_rx.recv() => match generation {
                        Some(g) => Wake::Silence(g),
                        None => continue,
                    },
                    command = command_rx.recv() => Wake::Command(command),
                }
            };

            match wake {
                Wake::Speech(Some(event)) => self.on_speech(event).await,
                Wake::Speech(None) => {
                    // Recognizer stream ended on its own; the watchdog will
                    // fire and interpret whatever was accumulated.
                    debug!("speech stream ended");
                    self.speech_rx = None;
                }
                Wake::Silence(generation) => self.on_silence(generation).await,
                Wake::Command(Some(SessionCommand::Cancel)) | Wake::Command(None) => {
                    self.shutdown().await;
                    break;
                }
                Wake::Command(Some(command)) => self.on_command(command).await,
            }
        }
    }

    async fn on_speech(&mut self, event: SpeechEvent) {
        if !event.is_silent() {
            self.watchdog.reset();
        }

        let mut st = self.state.lock().await;
        let finalized = event.final_text.trim();
        if !finalized.is_empty() {
            if st.final_text.is_empty() {
                st.final_text = finalized.to_string();
            } else {
                st.final_text.push(' ');
                st.final_text.push_str(finalized);
            }
        }
        st.interim_text = event.interim_text;
    }

    async fn on_silence(&mut self, generation: u64) {
        if !self.watchdog.is_current(generation) {
            debug!("stale silence fire discarded (generation {})", generation);
            return;
        }

        let (phase, transcript, time_hint, hint_spoken, space_id) = {
            let st = self.state.lock().await;
            if st.busy {
                debug!("silence fire discarded, transition in flight");
                return;
            }
            if !st.active {
                return;
            }
            (
                st.phase,
                format!("{} {}", st.final_text, st.interim_text)
                    .trim()
                    .to_string(),
                st.time_hint.clone(),
                st.time_hint_spoken,
                st.detail.as_ref().map(|d| d.parking_space.id),
            )
        };

        self.set_busy(true).await;
        let outcome = interpret::interpret(
            self.gateway.as_ref(),
            phase,
            StepInput {
                user_id: self.user_id,
                transcript: &transcript,
                time_hint: &time_hint,
                time_hint_spoken: hint_spoken,
                selected_space_id: space_id,
            },
        )
        .await;
        self.apply(outcome).await;
        self.set_busy(false).await;
    }

    async fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Select(index) => self.on_select(index).await,
            SessionCommand::SetTimeText(text) => {
                let mut st = self.state.lock().await;
                st.time_hint = text.trim().to_string();
                // Edited by hand: needs speech or an explicit confirm
                st.time_hint_spoken = false;
            }
            SessionCommand::Reserve => self.on_reserve().await,
            SessionCommand::BookAgain => self.on_book_again().await,
            SessionCommand::Cancel => {} // handled in run()
        }
    }

    /// Manual list tap: equivalent to the Choice phase resolving to
    /// ordinal index + 1.
    async fn on_select(&mut self, index: usize) {
        let time_hint = {
            let mut st = self.state.lock().await;
            if !st.active || st.busy || st.phase == Phase::Idle {
                debug!("select ignored (busy or terminal)");
                return;
            }
            if index >= st.items.len() {
                st.status = Some("해당 번호의 공간이 없어요.".to_string());
                return;
            }
            (!st.time_hint.is_empty()).then(|| st.time_hint.clone())
        };

        self.set_busy(true).await;
        let outcome = interpret::resolve_selection(
            self.gateway.as_ref(),
            self.user_id,
            index as u32 + 1,
            time_hint.as_deref(),
        )
        .await;
        self.apply(outcome).await;
        self.set_busy(false).await;
    }

    /// Manual confirm of the current time hint: equivalent to Time-phase
    /// silence with an empty transcript.
    async fn on_reserve(&mut self) {
        let (time_hint, space_id) = {
            let st = self.state.lock().await;
            if !st.active || st.busy || st.phase != Phase::Time {
                debug!("reserve ignored (busy or wrong phase)");
                return;
            }
            (
                st.time_hint.clone(),
                st.detail.as_ref().map(|d| d.parking_space.id),
            )
        };

        self.set_busy(true).await;
        let outcome = interpret::interpret_time(
            self.gateway.as_ref(),
            StepInput {
                user_id: self.user_id,
                transcript: "",
                time_hint: &time_hint,
                // Explicit confirm: treat the hint as the user's words
                time_hint_spoken: true,
                selected_space_id: space_id,
            },
        )
        .await;
        self.apply(outcome).await;
        self.set_busy(false).await;
    }

    async fn on_book_again(&mut self) {
        let phase = {
            let mut st = self.state.lock().await;
            if !st.active || st.busy {
                return;
            }
            st.reservation = None;
            st.detail = None;
            st.time_hint.clear();
            st.time_hint_spoken = false;
            st.status = None;
            st.phase = if st.items.is_empty() {
                Phase::Address
            } else {
                Phase::Choice
            };
            st.phase
        };

        self.say(phase.prompt()).await;
        self.restart_listening().await;
    }

    /// Apply a step outcome to the session, narrate it, and adjust the
    /// listening state. Outcomes arriving after cancellation are discarded.
    async fn apply(&mut self, outcome: StepOutcome) {
        let phase_changed;
        {
            let mut st = self.state.lock().await;
            if !st.active {
                debug!("outcome discarded, session cancelled");
                return;
            }

            phase_changed = st.phase != outcome.next_phase;
            st.phase = outcome.next_phase;
            if let Some(items) = outcome.items {
                st.items = items;
            }
            if let Some(detail) = outcome.detail {
                st.detail = Some(detail);
            }
            if let Some(hint) = outcome.time_hint {
                st.time_hint = hint;
            }
            if let Some(spoken) = outcome.time_hint_spoken {
                st.time_hint_spoken = spoken;
            }
            if let Some(reservation) = outcome.reservation {
                st.reservation = Some(reservation);
            }
            if outcome.status.is_some() {
                st.status = outcome.status.clone();
            } else if phase_changed {
                st.status = None;
            }
        }

        match outcome.status {
            Some(line) => self.say(&line).await,
            None if phase_changed => self.say(outcome.next_phase.prompt()).await,
            None => {}
        }

        match outcome.listen {
            Listen::Continue => {}
            Listen::Restart => self.restart_listening().await,
            Listen::Stop => self.stop_recognizer().await,
        }
    }

    /// Stop → settle → start. The settle pause keeps a stray "ended" event
    /// from a just-stopped recognizer out of the fresh instance.
    async fn restart_listening(&mut self) {
        self.stop_recognizer().await;
        tokio::time::sleep(self.settle).await;
        self.begin_listening().await;
    }

    async fn begin_listening(&mut self) {
        // The accumulated transcript resets exactly when a new listening
        // segment begins.
        {
            let mut st = self.state.lock().await;
            st.final_text.clear();
            st.interim_text.clear();
        }

        match self.recognizer.start().await {
            Ok(rx) => {
                self.speech_rx = Some(rx);
                self.watchdog.reset();
                self.state.lock().await.listening = true;
            }
            Err(e) => {
                warn!("recognizer unavailable: {}", e);
                let mut st = self.state.lock().await;
                st.listening = false;
                st.status = Some(
                    "이 환경에서는 음성 인식을 사용할 수 없어요. 버튼으로 계속 진행해 주세요."
                        .to_string(),
                );
            }
        }
    }

    /// Fully stop the current recognizer and clear the watchdog. Awaited
    /// before any new `start`, so at most one instance is ever live.
    async fn stop_recognizer(&mut self) {
        self.watchdog.cancel();
        self.speech_rx = None;
        if self.recognizer.is_listening() {
            if let Err(e) = self.recognizer.stop().await {
                error!("recognizer stop failed: {}", e);
            }
        }
        self.state.lock().await.listening = false;
    }

    async fn shutdown(&mut self) {
        info!("closing voice session");
        {
            let mut st = self.state.lock().await;
            st.active = false;
            st.busy = false;
        }
        self.stop_recognizer().await;
    }

    async fn set_busy(&self, busy: bool) {
        self.state.lock().await.busy = busy;
    }

    async fn say(&self, line: &str) {
        if let Err(e) = self.speaker.say(line).await {
            warn!("speaker failed: {}", e);
        }
    }
}
