use serde_json::json;
use tracing::debug;

use super::{
    BookingGateway, DetailResponse, GatewayError, ListResponse, ReserveResponse,
};
use crate::booking::{ParkingSpaceDetail, ParkingSpaceListItem, ReservationResult};
use crate::config::GatewayConfig;

/// Booking gateway over the backend's /stt/* HTTP endpoints.
pub struct HttpBookingGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBookingGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl BookingGateway for HttpBookingGateway {
    async fn list_nearby(
        &self,
        user_id: i64,
        address: &str,
    ) -> Result<Vec<ParkingSpaceListItem>, GatewayError> {
        debug!("gateway list_nearby: user={} address={}", user_id, address);

        let response = self
            .client
            .post(format!("{}/stt/list", self.base_url))
            .query(&[("userId", user_id)])
            .json(&json!({ "address": address }))
            .send()
            .await?;
        let body: ListResponse = Self::check(response).await?.json().await?;

        if !body.success {
            return Err(GatewayError::Rejected("list failed".to_string()));
        }
        Ok(body.data)
    }

    async fn fetch_detail(
        &self,
        user_id: i64,
        selection_text: &str,
    ) -> Result<ParkingSpaceDetail, GatewayError> {
        debug!("gateway fetch_detail: user={} text={}", user_id, selection_text);

        let response = self
            .client
            .post(format!("{}/stt/detail", self.base_url))
            .query(&[("userId", user_id)])
            .json(&json!({ "text": selection_text }))
            .send()
            .await?;
        let body: DetailResponse = Self::check(response).await?.json().await?;

        match body.data {
            Some(data) if body.success => Ok(data),
            _ => Err(GatewayError::Rejected("detail failed".to_string())),
        }
    }

    async fn reserve(
        &self,
        user_id: i64,
        parking_space_id: i64,
        time_text: &str,
    ) -> Result<ReservationResult, GatewayError> {
        debug!(
            "gateway reserve: user={} space={} text={}",
            user_id, parking_space_id, time_text
        );

        let response = self
            .client
            .post(format!("{}/stt/reserve", self.base_url))
            .query(&[
                ("userId", user_id),
                ("parkingSpaceId", parking_space_id),
            ])
            .json(&json!({ "text": time_text }))
            .send()
            .await?;
        let body: ReserveResponse = Self::check(response).await?.json().await?;

        match body.data {
            Some(data) if body.success => Ok(data),
            _ => Err(GatewayError::Rejected(if body.message.is_empty() {
                "reserve failed".to_string()
            } else {
                body.message
            })),
        }
    }
}
