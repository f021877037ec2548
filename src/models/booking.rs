use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Contact fields typed by the customer in the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub notes: String,
}

/// Body of `POST /api/appointments?action=book`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub service_variation_id: Option<String>,
    #[serde(default)]
    pub service_variation_version: Option<i64>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub start_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_member_id: Option<String>,
    #[serde(default)]
    pub customer_first_name: Option<String>,
    #[serde(default)]
    pub customer_last_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_note: Option<String>,
}

impl BookingRequest {
    pub fn has_required_fields(&self) -> bool {
        fn present(v: &Option<String>) -> bool {
            v.as_deref().is_some_and(|s| !s.trim().is_empty())
        }
        present(&self.service_variation_id)
            && present(&self.location_id)
            && self.start_at.is_some()
            && present(&self.customer_first_name)
            && present(&self.customer_email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedBooking {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub booking: ConfirmedBooking,
    pub message: String,
}
