//! Remote booking backend, consumed through a narrow request/response
//! contract. Three dependent operations; the session awaits each one
//! sequentially and never overlaps calls.

mod http;

pub use http::HttpBookingGateway;

use serde::Deserialize;
use thiserror::Error;

use crate::booking::{ParkingSpaceDetail, ParkingSpaceListItem, ReservationResult};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("gateway returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("gateway rejected the request: {0}")]
    Rejected(String),
}

#[async_trait::async_trait]
pub trait BookingGateway: Send + Sync {
    /// List spaces near a spoken address. An empty list is a valid,
    /// non-error outcome.
    async fn list_nearby(
        &self,
        user_id: i64,
        address: &str,
    ) -> Result<Vec<ParkingSpaceListItem>, GatewayError>;

    /// Fetch the detail for a natural-language ordinal phrase ("3번째")
    /// against the most recent list. Fails when the ordinal does not
    /// resolve server-side.
    async fn fetch_detail(
        &self,
        user_id: i64,
        selection_text: &str,
    ) -> Result<ParkingSpaceDetail, GatewayError>;

    /// Create a reservation from natural-language time text. Fails on
    /// invalid or overlapping times and on invalid space ids.
    async fn reserve(
        &self,
        user_id: i64,
        parking_space_id: i64,
        time_text: &str,
    ) -> Result<ReservationResult, GatewayError>;
}

/// Wire envelope for the list call.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<ParkingSpaceListItem>,
    #[allow(dead_code)]
    pub timestamp: String,
}

/// Wire envelope for the detail call.
#[derive(Debug, Deserialize)]
pub(crate) struct DetailResponse {
    pub success: bool,
    pub data: Option<ParkingSpaceDetail>,
    #[allow(dead_code)]
    pub timestamp: String,
}

/// Wire envelope for the reserve call.
#[derive(Debug, Deserialize)]
pub(crate) struct ReserveResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<ReservationResult>,
    #[allow(dead_code)]
    pub timestamp: String,
}
