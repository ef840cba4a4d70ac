pub mod booking;
pub mod config;
pub mod gateway;
pub mod http;
pub mod nlu;
pub mod stt;
pub mod tts;

pub use booking::{
    BookingSession, ParkingSpaceDetail, ParkingSpaceListItem, Phase, ReservationResult,
    SessionSnapshot, SilenceWatchdog, TimeSlot,
};
pub use config::Config;
pub use gateway::{BookingGateway, GatewayError, HttpBookingGateway};
pub use http::{create_router, AppState};
pub use stt::{RecognizerProvider, ScriptedRecognizer, SpeechEvent, SpeechRecognizer};
pub use tts::{Speaker, TracingSpeaker};
