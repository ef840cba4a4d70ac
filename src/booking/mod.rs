//! Voice quick-booking core
//!
//! This module provides the `BookingSession` state machine that manages:
//! - The conversational phase (Address → Choice → Time → Idle)
//! - The accumulated transcript and silence watchdog
//! - Recognizer restart discipline (stop, settle, start)
//! - The dependent remote calls (list → detail → reserve)
//! - Re-prompting and retry on empty, ambiguous, or failed steps

mod interpret;
mod phase;
mod session;
mod types;
mod watchdog;

pub use interpret::{
    interpret, interpret_address, interpret_choice, interpret_time, resolve_selection, Listen,
    StepInput, StepOutcome,
};
pub use phase::Phase;
pub use session::{BookingSession, SessionSnapshot};
pub use types::{hhmm, ParkingSpaceDetail, ParkingSpaceListItem, ReservationResult, TimeSlot};
pub use watchdog::SilenceWatchdog;
