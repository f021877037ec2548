use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub review_id: String,
    pub reviewer_name: String,
    pub town: String,
    pub stars: i64,
    pub service_type: String,
    pub review_text: String,
    pub status: ReviewStatus,
    pub submitted_at: NaiveDateTime,
    pub moderated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReviewStatus::Pending),
            "approved" => Some(ReviewStatus::Approved),
            "rejected" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }
}

/// Raw form body of a review submission. `stars` may arrive as a number or a string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub name: Option<String>,
    pub town: Option<String>,
    pub stars: Option<serde_json::Value>,
    pub service_type: Option<String>,
    pub review_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(ModerationAction::Approve),
            "reject" => Some(ModerationAction::Reject),
            _ => None,
        }
    }

    pub fn resulting_status(self) -> ReviewStatus {
        match self {
            ModerationAction::Approve => ReviewStatus::Approved,
            ModerationAction::Reject => ReviewStatus::Rejected,
        }
    }
}
