use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use super::{error_message, SchedulingBackend};
use crate::errors::BackendError;
use crate::models::{
    AvailabilityQuery, BookingConfirmation, BookingRequest, ConfirmedBooking, Money, Service,
    ServiceCatalog, TimeSlot,
};

const SQUARE_VERSION: &str = "2024-10-17";
const PRODUCTION_URL: &str = "https://connect.squareup.com/v2";
const SANDBOX_URL: &str = "https://connect.squareupsandbox.com/v2";

/// Square Appointments REST client. Holds the access token server-side.
pub struct SquareClient {
    access_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl SquareClient {
    pub fn new(access_token: String, environment: &str) -> Self {
        let base_url = if environment == "production" {
            PRODUCTION_URL
        } else {
            SANDBOX_URL
        };
        Self::with_base_url(access_token, base_url.to_string())
    }

    pub fn with_base_url(access_token: String, base_url: String) -> Self {
        Self {
            access_token,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, BackendError> {
        if self.access_token.is_empty() {
            return Err(BackendError::Unavailable(
                "Square access token is not configured".to_string(),
            ));
        }

        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .header("Square-Version", SQUARE_VERSION);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to call Square API: {e}")))?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to parse Square response: {e}")))?;

        if !status.is_success() {
            tracing::warn!(%status, path, "Square API error");
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: error_message(&data).unwrap_or_else(|| "Square API error".to_string()),
            });
        }

        Ok(data)
    }

    async fn find_or_create_customer(&self, request: &BookingRequest) -> Result<String, BackendError> {
        let email = request.customer_email.as_deref().unwrap_or_default();

        let search = self
            .request(
                Method::POST,
                "/customers/search",
                Some(&json!({
                    "query": { "filter": { "email_address": { "exact": email } } }
                })),
            )
            .await;

        match search {
            Ok(found) => {
                if let Some(id) = found["customers"][0]["id"].as_str() {
                    return Ok(id.to_string());
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "customer search failed, creating a new customer");
            }
        }

        let created = self
            .request(
                Method::POST,
                "/customers",
                Some(&json!({
                    "given_name": request.customer_first_name.as_deref().unwrap_or_default(),
                    "family_name": request.customer_last_name.as_deref().unwrap_or_default(),
                    "email_address": email,
                    "phone_number": request.customer_phone.as_deref().unwrap_or_default(),
                })),
            )
            .await?;

        created["customer"]["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BackendError::Unavailable("missing customer id in Square response".to_string()))
    }
}

#[async_trait]
impl SchedulingBackend for SquareClient {
    async fn list_services(&self) -> Result<ServiceCatalog, BackendError> {
        let locations = self.request(Method::GET, "/locations", None).await?;
        let location_id = locations["locations"]
            .as_array()
            .and_then(|ls| ls.iter().find(|l| l["status"] == "ACTIVE"))
            .and_then(|l| l["id"].as_str())
            .map(|s| s.to_string());

        let Some(location_id) = location_id else {
            tracing::warn!("no active Square location");
            return Ok(ServiceCatalog::default());
        };

        let catalog = self
            .request(Method::GET, "/catalog/list?types=ITEM", None)
            .await?;
        let services = catalog["objects"]
            .as_array()
            .map(|items| items.iter().map(parse_catalog_item).collect())
            .unwrap_or_default();

        Ok(ServiceCatalog {
            services,
            location_id: Some(location_id),
        })
    }

    async fn search_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<TimeSlot>, BackendError> {
        let body = json!({
            "query": {
                "filter": {
                    "start_at_range": {
                        "start_at": query.start_at.to_rfc3339(),
                        "end_at": query.end_at.to_rfc3339(),
                    },
                    "location_id": query.location_id,
                    "segment_filters": [{
                        "service_variation_id": query.service_variation_id,
                    }],
                }
            }
        });

        let data = self
            .request(Method::POST, "/bookings/availability/search", Some(&body))
            .await?;

        match data.get("availabilities") {
            None | Some(Value::Null) => Ok(vec![]),
            Some(list) => serde_json::from_value(list.clone()).map_err(|e| {
                BackendError::Unavailable(format!("unexpected availability payload: {e}"))
            }),
        }
    }

    async fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingConfirmation, BackendError> {
        if !request.has_required_fields() {
            return Err(BackendError::Rejected {
                status: 400,
                message: "Missing required booking fields".to_string(),
            });
        }

        let customer_id = self.find_or_create_customer(request).await?;

        let mut segment = json!({
            "service_variation_id": request.service_variation_id,
            "service_variation_version": request.service_variation_version.unwrap_or(1),
            "duration_minutes": request.duration_minutes.unwrap_or(60),
        });
        if let Some(team_member_id) = &request.team_member_id {
            segment["team_member_id"] = json!(team_member_id);
        }

        let body = json!({
            "booking": {
                "appointment_segments": [segment],
                "customer_id": customer_id,
                "customer_note": request.customer_note.as_deref().unwrap_or_default(),
                "location_id": request.location_id,
                "start_at": request.start_at.map(|t| t.to_rfc3339()),
            },
            "idempotency_key": uuid::Uuid::new_v4().to_string(),
        });

        let data = self.request(Method::POST, "/bookings", Some(&body)).await?;
        let booking: ConfirmedBooking = serde_json::from_value(data["booking"].clone())
            .map_err(|e| BackendError::Unavailable(format!("unexpected booking payload: {e}")))?;

        tracing::info!(booking_id = %booking.id, "created Square booking");

        Ok(BookingConfirmation {
            booking,
            message: "Booking created successfully".to_string(),
        })
    }
}

/// Map one catalog `ITEM` object to a bookable service, using its first variation.
fn parse_catalog_item(item: &Value) -> Service {
    let item_data = &item["item_data"];
    let variation = &item_data["variations"][0];
    let var_data = &variation["item_variation_data"];

    let variation_version = variation["version"]
        .as_i64()
        .or_else(|| variation["version"].as_str().and_then(|v| v.parse().ok()));

    let duration_minutes = var_data["service_duration"]
        .as_f64()
        .map(|ms| (ms / 60_000.0).round() as i64)
        .unwrap_or(60);

    let price_money: Option<Money> = serde_json::from_value(var_data["price_money"].clone()).ok();

    Service {
        id: item["id"].as_str().unwrap_or_default().to_string(),
        name: item_data["name"].as_str().unwrap_or("Service").to_string(),
        description: item_data["description"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        variation_id: variation["id"].as_str().map(|s| s.to_string()),
        variation_version,
        duration_minutes,
        price_money,
    }
}
