use serde::{Deserialize, Serialize};

/// One nearby space as returned by the list call. Immutable snapshot for the
/// lifetime of the Choice phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpaceListItem {
    pub id: i64,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Combined date-time wire string; display layers truncate to HH:MM.
    pub available_start_time: String,
    pub available_end_time: String,
    pub price: i64,
    pub status: bool,
    pub available_count: u32,
}

/// A recommended reservation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: String,
    pub end_time: String,
}

/// The selected space plus its recommended time slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpaceDetail {
    pub parking_space: ParkingSpaceListItem,
    pub available_time_slots: Vec<TimeSlot>,
}

impl ParkingSpaceDetail {
    /// Default reservation-time hint from the first recommended slot, e.g.
    /// "09:00부터 11:00까지". `None` when no slots were recommended.
    pub fn default_time_hint(&self) -> Option<String> {
        self.available_time_slots
            .first()
            .map(|slot| format!("{}부터 {}까지", hhmm(&slot.start_time), hhmm(&slot.end_time)))
    }
}

/// Terminal artifact of the flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResult {
    pub id: i64,
    pub user_id: i64,
    pub parking_space_id: i64,
    pub start_time: String,
    pub end_time: String,
    /// "RESERVED" on success; other statuses pass through untouched.
    pub status: String,
}

/// Truncate a wire time to HH:MM for display. Accepts both combined
/// date-times ("2025-11-02T09:00:00") and bare times ("09:00:00").
pub fn hhmm(wire: &str) -> &str {
    if wire.len() >= 16 && wire.is_char_boundary(11) && wire.is_char_boundary(16) {
        &wire[11..16]
    } else if wire.len() >= 5 && wire.is_char_boundary(5) {
        &wire[..5]
    } else {
        wire
    }
}
