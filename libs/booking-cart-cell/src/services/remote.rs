use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use shared_config::AppConfig;
use shared_database::rest::RestClient;

use crate::{BookingKind, CartError, ScheduledAt};

/// Remote scheduling contracts the cart engine depends on.
#[async_trait]
pub trait SchedulingApi: Send + Sync {
    /// Raw availability payload; its shape is not guaranteed and is normalized by the slot catalog.
    async fn get_availability(&self, kind: BookingKind, target_id: i64, date: NaiveDate) -> Result<Value, CartError>;

    async fn update_booking_schedule(
        &self,
        kind: BookingKind,
        remote_id: i64,
        scheduled_at: ScheduledAt,
    ) -> Result<(), CartError>;

    async fn delete_booking_item(&self, kind: BookingKind, remote_id: i64) -> Result<(), CartError>;
}

pub struct RestSchedulingApi {
    client: RestClient,
}

impl RestSchedulingApi {
    pub fn new(config: &AppConfig) -> Result<Self, CartError> {
        let client = RestClient::new(config)
            .map_err(|e| CartError::AvailabilityFault(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn availability_path(kind: BookingKind, target_id: i64) -> String {
        match kind {
            BookingKind::Appointment => format!("/api/doctors/{}/availability", target_id),
            BookingKind::DiagnosticTest => format!("/api/diagnostic-centers/{}/slots", target_id),
        }
    }

    fn cart_item_path(kind: BookingKind, remote_id: i64) -> String {
        format!("/api/cart/{}/{}", kind.cart_segment(), remote_id)
    }
}

#[async_trait]
impl SchedulingApi for RestSchedulingApi {
    #[instrument(skip(self))]
    async fn get_availability(&self, kind: BookingKind, target_id: i64, date: NaiveDate) -> Result<Value, CartError> {
        let path = Self::availability_path(kind, target_id);
        let query = [("date", date.format("%Y-%m-%d").to_string())];

        let body: Value = self.client
            .request_with_query(Method::GET, &path, &query)
            .await
            .map_err(|e| CartError::AvailabilityFault(e.to_string()))?;

        debug!("Availability for {} {} on {} received", kind, target_id, date);
        Ok(body)
    }

    #[instrument(skip(self))]
    async fn update_booking_schedule(
        &self,
        kind: BookingKind,
        remote_id: i64,
        scheduled_at: ScheduledAt,
    ) -> Result<(), CartError> {
        let body = json!({
            "scheduled_at": scheduled_at.to_string(),
            "date": scheduled_at.date().format("%Y-%m-%d").to_string(),
            "time": scheduled_at.time().format("%H:%M:%S").to_string(),
        });

        self.client
            .execute(Method::PATCH, &Self::cart_item_path(kind, remote_id), Some(body))
            .await
            .map_err(|e| CartError::SyncFault(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete_booking_item(&self, kind: BookingKind, remote_id: i64) -> Result<(), CartError> {
        self.client
            .execute(Method::DELETE, &Self::cart_item_path(kind, remote_id), None)
            .await
            .map_err(|e| CartError::SyncFault(e.to_string()))
    }
}
