pub mod demo;
pub mod proxy;
pub mod square;

use async_trait::async_trait;

use crate::errors::BackendError;
use crate::models::{AvailabilityQuery, BookingConfirmation, BookingRequest, ServiceCatalog, TimeSlot};

#[async_trait]
pub trait SchedulingBackend: Send + Sync {
    async fn list_services(&self) -> Result<ServiceCatalog, BackendError>;

    async fn search_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<TimeSlot>, BackendError>;

    async fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingConfirmation, BackendError>;
}

/// Pull a human-readable message out of an error payload.
///
/// Understands `{"error": "..."}` from the proxy and
/// `{"errors": [{"detail": "..."}]}` from Square.
pub fn error_message(body: &serde_json::Value) -> Option<String> {
    if let Some(msg) = body["error"].as_str() {
        return Some(msg.to_string());
    }
    let first = &body["errors"][0];
    first["detail"]
        .as_str()
        .or_else(|| first["code"].as_str())
        .map(|s| s.to_string())
}
