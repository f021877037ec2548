use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Forbidden: invalid API key")]
    Forbidden,

    #[error("{0}")]
    RateLimited(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Backend(BackendError::Rejected { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Backend(BackendError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            AppError::Backend(BackendError::Unavailable(reason)) => {
                tracing::error!(error = %reason, "scheduling backend unavailable");
                "Scheduling service unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// Failure of a scheduling backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend answered with a structured error payload.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Transport failure, unreadable response, or backend not configured.
    #[error("scheduling backend unavailable: {0}")]
    Unavailable(String),
}

/// Refused wizard operation. The wizard state is unchanged when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("the current step is not complete")]
    StepIncomplete,

    #[error("operation not available in the current step")]
    WrongStep,

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("date {0} has no available slots")]
    DateUnavailable(chrono::NaiveDate),

    #[error("no slot starts at {0}")]
    UnknownSlot(String),

    #[error("cannot navigate before the current month")]
    MonthInPast,

    #[error("a submission is already in progress")]
    AlreadySubmitting,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_keeps_upstream_status() {
        let err = AppError::Backend(BackendError::Rejected {
            status: 409,
            message: "slot taken".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unavailable_is_masked_bad_gateway() {
        let err = AppError::Backend(BackendError::Unavailable(
            "failed to call Square API: error sending request for url (https://connect.squareup.com/v2/bookings)".to_string(),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Scheduling service unavailable");
    }

    #[test]
    fn test_backend_message_is_verbatim() {
        let err = BackendError::Rejected {
            status: 400,
            message: "Booking start time is in the past".to_string(),
        };
        assert_eq!(err.to_string(), "Booking start time is in the past");
    }
}
