use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{error_message, SchedulingBackend};
use crate::errors::BackendError;
use crate::models::{AvailabilityQuery, BookingConfirmation, BookingRequest, ServiceCatalog, TimeSlot};

/// Talks to our own `/api/appointments` endpoint, which proxies Square.
pub struct ProxyBackend {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    availabilities: Vec<TimeSlot>,
}

impl ProxyBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/appointments", self.base_url)
    }
}

/// The proxy itself is up but could not reach Square. Treated like a network failure.
fn is_gateway_failure(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 502..=504)
}

async fn decode<T: DeserializeOwned>(
    resp: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, BackendError> {
    let resp = resp.map_err(|e| BackendError::Unavailable(format!("request failed: {e}")))?;
    let status = resp.status();
    if is_gateway_failure(status) {
        return Err(BackendError::Unavailable(format!("scheduling proxy returned {status}")));
    }
    let data: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| BackendError::Unavailable(format!("unreadable response: {e}")))?;

    if !status.is_success() {
        return Err(BackendError::Rejected {
            status: status.as_u16(),
            message: error_message(&data).unwrap_or_else(|| format!("request failed ({status})")),
        });
    }

    serde_json::from_value(data)
        .map_err(|e| BackendError::Unavailable(format!("unexpected response shape: {e}")))
}

#[async_trait]
impl SchedulingBackend for ProxyBackend {
    async fn list_services(&self) -> Result<ServiceCatalog, BackendError> {
        let resp = self
            .client
            .get(self.endpoint())
            .query(&[("action", "services")])
            .send()
            .await;
        decode(resp).await
    }

    async fn search_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<TimeSlot>, BackendError> {
        let resp = self
            .client
            .get(self.endpoint())
            .query(&[("action", "availability")])
            .query(query)
            .send()
            .await;
        let body: AvailabilityResponse = decode(resp).await?;
        Ok(body.availabilities)
    }

    async fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingConfirmation, BackendError> {
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("action", "book")])
            .json(request)
            .send()
            .await;
        decode(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let backend = ProxyBackend::new("http://localhost:3000/".to_string());
        assert_eq!(backend.endpoint(), "http://localhost:3000/api/appointments");
    }

    #[test]
    fn test_gateway_statuses() {
        assert!(is_gateway_failure(reqwest::StatusCode::BAD_GATEWAY));
        assert!(is_gateway_failure(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_gateway_failure(reqwest::StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_gateway_failure(reqwest::StatusCode::BAD_REQUEST));
        assert!(!is_gateway_failure(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        // port 9 (discard) is not expected to run an HTTP server
        let backend = ProxyBackend::new("http://127.0.0.1:9".to_string());
        let err = backend.list_services().await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
