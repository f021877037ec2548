use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// One bookable start time, as returned by the availability search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_at: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default)]
    pub appointment_segments: Vec<AppointmentSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSegment {
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub team_member_id: Option<String>,
    #[serde(default)]
    pub service_variation_id: Option<String>,
    #[serde(default)]
    pub service_variation_version: Option<i64>,
}

impl TimeSlot {
    pub fn local_start(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        self.start_at.with_timezone(&offset)
    }

    pub fn local_date(&self, offset: FixedOffset) -> NaiveDate {
        self.local_start(offset).date_naive()
    }

    pub fn team_member_id(&self) -> Option<&str> {
        self.appointment_segments
            .first()
            .and_then(|s| s.team_member_id.as_deref())
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        self.appointment_segments
            .first()
            .and_then(|s| s.duration_minutes)
    }
}

/// Calendar month used as the availability cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parameters of one availability search. Serialized as the proxy's query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub service_variation_id: String,
    #[serde(rename = "startDate")]
    pub start_at: DateTime<FixedOffset>,
    #[serde(rename = "endDate")]
    pub end_at: DateTime<FixedOffset>,
    pub location_id: String,
}
