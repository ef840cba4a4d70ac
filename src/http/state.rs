use crate::booking::BookingSession;
use crate::config::VoiceConfig;
use crate::gateway::BookingGateway;
use crate::stt::RecognizerProvider;
use crate::tts::Speaker;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live voice sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<BookingSession>>>>,

    /// Booking backend shared by all sessions
    pub gateway: Arc<dyn BookingGateway>,

    /// Prompt playback shared by all sessions
    pub speaker: Arc<dyn Speaker>,

    /// Creates one recognizer per session (each session owns its instance)
    pub recognizers: Arc<dyn RecognizerProvider>,

    pub voice: VoiceConfig,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn BookingGateway>,
        speaker: Arc<dyn Speaker>,
        recognizers: Arc<dyn RecognizerProvider>,
        voice: VoiceConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            gateway,
            speaker,
            recognizers,
            voice,
        }
    }
}
