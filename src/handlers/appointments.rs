use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::{AvailabilityQuery, BookingRequest};
use crate::services::dates;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentsParams {
    pub action: Option<String>,
    pub service_variation_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location_id: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

// GET|POST /api/appointments?action=services|availability|book
pub async fn appointments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AppointmentsParams>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    match params.action.as_deref() {
        Some("services") => list_services(&state).await,
        Some("availability") => search_availability(&state, &params).await,
        Some("book") => create_booking(&state, &body).await,
        _ => Err(AppError::Validation(
            "Invalid action. Use: services, availability, or book".to_string(),
        )),
    }
}

async fn list_services(state: &AppState) -> Result<Json<Value>, AppError> {
    let catalog = state.scheduler.list_services().await?;
    tracing::info!(count = catalog.services.len(), "listed bookable services");
    Ok(Json(json!(catalog)))
}

async fn search_availability(
    state: &AppState,
    params: &AppointmentsParams,
) -> Result<Json<Value>, AppError> {
    let (Some(variation), Some(start), Some(end), Some(location)) = (
        present(&params.service_variation_id),
        present(&params.start_date),
        present(&params.end_date),
        present(&params.location_id),
    ) else {
        return Err(AppError::Validation(
            "Missing required parameters: serviceVariationId, startDate, endDate, locationId"
                .to_string(),
        ));
    };

    let (Some(start_at), Some(end_at)) = (dates::parse_iso(start), dates::parse_iso(end)) else {
        return Err(AppError::Validation(
            "startDate and endDate must be ISO 8601 timestamps".to_string(),
        ));
    };

    let query = AvailabilityQuery {
        service_variation_id: variation.to_string(),
        start_at,
        end_at,
        location_id: location.to_string(),
    };
    let slots = state.scheduler.search_availability(&query).await?;
    tracing::debug!(variation, %start_at, %end_at, slots = slots.len(), "availability searched");

    Ok(Json(json!({ "availabilities": slots })))
}

async fn create_booking(state: &AppState, body: &[u8]) -> Result<Json<Value>, AppError> {
    let request: BookingRequest = if body.is_empty() {
        serde_json::from_str("{}")
    } else {
        serde_json::from_slice(body)
    }
    .map_err(|_| AppError::Validation("Request body must be valid JSON".to_string()))?;

    if !request.has_required_fields() {
        return Err(AppError::Validation("Missing required booking fields".to_string()));
    }

    let confirmation = state.scheduler.create_booking(&request).await?;
    tracing::info!(booking_id = %confirmation.booking.id, "booking created");
    Ok(Json(json!(confirmation)))
}
