use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub voice: VoiceConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    /// How long speech may pause before the accumulated transcript is
    /// interpreted (milliseconds).
    pub silence_window_ms: u64,

    /// Settle pause between stopping a recognizer and starting the next one
    /// (milliseconds). Platform workaround: a just-stopped recognizer can
    /// emit a stray "ended" event that a too-quickly-started instance would
    /// misinterpret.
    pub restart_settle_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            silence_window_ms: 5000,
            restart_settle_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the booking backend (the /stt/* endpoints).
    pub base_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
