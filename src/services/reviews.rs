use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{ModerationAction, Review, ReviewStatus, ReviewSubmission};

const RATE_LIMIT_WINDOW: Duration = Duration::hours(24);
const MIN_TEXT_LEN: usize = 10;
const MAX_TEXT_LEN: usize = 1000;

/// Review as published on the site.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicReview {
    pub review_id: String,
    pub name: String,
    pub town: String,
    pub stars: i64,
    pub service_type: String,
    pub review_text: String,
    pub date: String,
}

/// Review as listed on the moderation dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationEntry {
    pub review_id: String,
    pub reviewer_name: String,
    pub timestamp: String,
    pub town: String,
    pub stars: i64,
    pub service_type: String,
    pub review_text: String,
    pub status: ReviewStatus,
}

fn iso(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl From<Review> for PublicReview {
    fn from(r: Review) -> Self {
        Self {
            date: iso(&r.submitted_at),
            review_id: r.review_id,
            name: r.reviewer_name,
            town: r.town,
            stars: r.stars,
            service_type: r.service_type,
            review_text: r.review_text,
        }
    }
}

impl From<Review> for ModerationEntry {
    fn from(r: Review) -> Self {
        Self {
            timestamp: iso(&r.submitted_at),
            review_id: r.review_id,
            reviewer_name: r.reviewer_name,
            town: r.town,
            stars: r.stars,
            service_type: r.service_type,
            review_text: r.review_text,
            status: r.status,
        }
    }
}

/// Integer star rating from a JSON number or a numeric string ("4", "4.5" → 4).
fn parse_stars(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

fn required(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Check a submission and build the pending review. Touches no storage.
pub fn validate_submission(
    submission: &ReviewSubmission,
    now: NaiveDateTime,
) -> Result<Review, AppError> {
    let missing = || {
        AppError::Validation(
            "All fields are required: name, town, stars, serviceType, reviewText".to_string(),
        )
    };

    let name = required(&submission.name).ok_or_else(missing)?;
    let town = required(&submission.town).ok_or_else(missing)?;
    let service_type = required(&submission.service_type).ok_or_else(missing)?;
    let review_text = required(&submission.review_text).ok_or_else(missing)?;
    let stars_value = submission
        .stars
        .as_ref()
        .filter(|v| !v.is_null() && v.as_str().map(|s| !s.trim().is_empty()).unwrap_or(true))
        .ok_or_else(missing)?;

    let stars = parse_stars(stars_value)
        .filter(|s| (1..=5).contains(s))
        .ok_or_else(|| AppError::Validation("Stars must be between 1 and 5".to_string()))?;

    let text_len = review_text.chars().count();
    if !(MIN_TEXT_LEN..=MAX_TEXT_LEN).contains(&text_len) {
        return Err(AppError::Validation(format!(
            "Review text must be between {MIN_TEXT_LEN} and {MAX_TEXT_LEN} characters"
        )));
    }

    Ok(Review {
        review_id: uuid::Uuid::new_v4().to_string(),
        reviewer_name: name,
        town,
        stars,
        service_type,
        review_text,
        status: ReviewStatus::Pending,
        submitted_at: now,
        moderated_at: None,
    })
}

/// Validate, enforce one submission per name per rolling day, and store as pending.
pub fn submit_review(
    conn: &Connection,
    submission: &ReviewSubmission,
    now: NaiveDateTime,
) -> Result<Review, AppError> {
    let review = validate_submission(submission, now)?;

    let recent = queries::count_reviews_since(conn, &review.reviewer_name, &(now - RATE_LIMIT_WINDOW))?;
    if recent > 0 {
        tracing::info!(name = %review.reviewer_name, "review rate limited");
        return Err(AppError::RateLimited(
            "You have already submitted a review in the last 24 hours. Please try again later."
                .to_string(),
        ));
    }

    queries::insert_review(conn, &review)?;
    tracing::info!(review_id = %review.review_id, stars = review.stars, "review submitted");
    Ok(review)
}

pub fn approved_reviews(conn: &Connection) -> Result<Vec<PublicReview>, AppError> {
    let reviews = queries::list_reviews_by_status(conn, ReviewStatus::Approved)?;
    Ok(reviews.into_iter().map(PublicReview::from).collect())
}

pub fn reviews_for_moderation(
    conn: &Connection,
    status: ReviewStatus,
) -> Result<Vec<ModerationEntry>, AppError> {
    let reviews = queries::list_reviews_by_status(conn, status)?;
    Ok(reviews.into_iter().map(ModerationEntry::from).collect())
}

/// Approve or reject a review and return it in its new state.
pub fn moderate_review(
    conn: &Connection,
    review_id: &str,
    action: ModerationAction,
    now: NaiveDateTime,
) -> Result<Review, AppError> {
    let mut review = queries::get_review(conn, review_id)?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    let status = action.resulting_status();
    queries::set_review_status(conn, review_id, status, &now)?;
    review.status = status;
    review.moderated_at = Some(now);

    tracing::info!(review_id, status = status.as_str(), "review moderated");
    Ok(review)
}
