use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::{ModerationAction, ReviewStatus, ReviewSubmission};
use crate::services::reviews;
use crate::state::AppState;

fn now_utc() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Moderation calls must carry `x-api-key` matching the configured key.
/// An unset key locks moderation entirely.
fn check_api_key(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let provided = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if expected.is_empty() || provided != expected {
        tracing::warn!("moderation request with invalid API key");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

// POST /api/reviews
pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<ReviewSubmission>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let review = {
        let db = state.db.lock().unwrap();
        reviews::submit_review(&db, &submission, now_utc())?
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Review submitted successfully. It will appear after approval.",
            "reviewId": review.review_id,
        })),
    ))
}

// GET /api/reviews
pub async fn approved_reviews(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let reviews = {
        let db = state.db.lock().unwrap();
        reviews::approved_reviews(&db)?
    };
    Ok(Json(json!({ "count": reviews.len(), "reviews": reviews })))
}

#[derive(Deserialize)]
pub struct ModerationQuery {
    pub status: Option<String>,
}

// GET /api/reviews/moderation?status=pending
pub async fn list_for_moderation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ModerationQuery>,
) -> Result<Json<Value>, AppError> {
    check_api_key(&headers, &state.config.moderation_api_key)?;

    let status = match query.status.as_deref() {
        None | Some("") => ReviewStatus::Pending,
        Some(s) => ReviewStatus::parse(s).ok_or_else(|| {
            AppError::Validation("Status must be pending, approved or rejected".to_string())
        })?,
    };

    let entries = {
        let db = state.db.lock().unwrap();
        reviews::reviews_for_moderation(&db, status)?
    };
    Ok(Json(json!({ "count": entries.len(), "reviews": entries })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRequest {
    pub review_id: Option<String>,
    pub action: Option<String>,
}

// POST /api/reviews/moderation
pub async fn moderate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ModerationRequest>,
) -> Result<Json<Value>, AppError> {
    check_api_key(&headers, &state.config.moderation_api_key)?;

    let (Some(review_id), Some(action)) = (
        req.review_id.as_deref().filter(|s| !s.is_empty()),
        req.action.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::Validation("reviewId and action are required".to_string()));
    };

    let action = ModerationAction::parse(action).ok_or_else(|| {
        AppError::Validation(r#"Action must be "approve" or "reject""#.to_string())
    })?;

    let review = {
        let db = state.db.lock().unwrap();
        reviews::moderate_review(&db, review_id, action, now_utc())?
    };

    Ok(Json(json!({
        "message": format!("Review {} successfully", review.status.as_str()),
        "reviewId": review.review_id,
        "status": review.status,
    })))
}
