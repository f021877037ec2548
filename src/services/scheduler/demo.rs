//! Synthetic scheduling backend used when the live one is unreachable.
//!
//! Availability is random but shaped like a real week: weekday business hours
//! with a lunch gap, Saturday mornings, nothing on Sundays, and never anything
//! in the past. Seed the generator for reproducible output.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::SchedulingBackend;
use crate::errors::BackendError;
use crate::models::{
    AppointmentSegment, AvailabilityQuery, BookingConfirmation, BookingRequest, ConfirmedBooking,
    Money, Service, ServiceCatalog, TimeSlot,
};
use crate::services::dates;

/// Hourly start times Monday to Friday; no noon slot.
const WEEKDAY_HOURS: [u32; 6] = [9, 10, 11, 13, 14, 15];
const SATURDAY_HOURS: [u32; 3] = [9, 10, 11];

const DAY_CLOSED_PROBABILITY: f64 = 0.2;
const SLOT_TAKEN_PROBABILITY: f64 = 0.3;

pub const DEMO_LOCATION_ID: &str = "demo-location";
pub const DEMO_TEAM_MEMBER_ID: &str = "demo-technician";

pub struct DemoScheduler {
    offset: FixedOffset,
    submit_delay: Duration,
    fixed_now: Option<DateTime<FixedOffset>>,
    rng: Mutex<StdRng>,
}

impl DemoScheduler {
    pub fn new(offset: FixedOffset, submit_delay: Duration) -> Self {
        Self {
            offset,
            submit_delay,
            fixed_now: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Pin "now" instead of reading the system clock.
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.fixed_now
            .map(|t| t.with_timezone(&self.offset))
            .unwrap_or_else(|| dates::now_in(self.offset))
    }

    fn slots_between(&self, query: &AvailabilityQuery) -> Vec<TimeSlot> {
        let now = self.now();
        let today = now.date_naive();
        let first = query.start_at.with_timezone(&self.offset).date_naive().max(today);
        let last = query.end_at.with_timezone(&self.offset).date_naive();

        let mut rng = self.rng.lock().unwrap();
        let mut slots = vec![];

        for date in first.iter_days().take_while(|d| *d <= last) {
            let hours = opening_hours(date);
            if hours.is_empty() || rng.gen_bool(DAY_CLOSED_PROBABILITY) {
                continue;
            }

            for &hour in hours {
                let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                    continue;
                };
                let start_at = dates::at_offset(self.offset, naive);
                if start_at <= now || rng.gen_bool(SLOT_TAKEN_PROBABILITY) {
                    continue;
                }
                slots.push(TimeSlot {
                    start_at,
                    location_id: Some(query.location_id.clone()),
                    appointment_segments: vec![AppointmentSegment {
                        duration_minutes: None,
                        team_member_id: Some(DEMO_TEAM_MEMBER_ID.to_string()),
                        service_variation_id: Some(query.service_variation_id.clone()),
                        service_variation_version: None,
                    }],
                });
            }
        }

        slots
    }
}

fn opening_hours(date: NaiveDate) -> &'static [u32] {
    match date.weekday() {
        Weekday::Sun => &[],
        Weekday::Sat => &SATURDAY_HOURS[..],
        _ => &WEEKDAY_HOURS[..],
    }
}

/// Services offered when the live catalog cannot be loaded.
pub fn fallback_catalog() -> ServiceCatalog {
    ServiceCatalog {
        services: vec![
            Service {
                id: "consult".to_string(),
                name: "Free Phone Consultation".to_string(),
                description: "Talk through your heating or cooling issue with a licensed technician over the phone. No cost, no obligation.".to_string(),
                variation_id: Some("consult-variation".to_string()),
                variation_version: Some(1),
                duration_minutes: 30,
                price_money: Some(Money {
                    amount: 0,
                    currency: "USD".to_string(),
                }),
            },
            Service {
                id: "diagnostic".to_string(),
                name: "Diagnostic Service Visit".to_string(),
                description: "A certified technician inspects your system at home and explains the issue and your repair options. The fee is waived if you proceed with the repair.".to_string(),
                variation_id: Some("diagnostic-variation".to_string()),
                variation_version: Some(1),
                duration_minutes: 60,
                price_money: Some(Money {
                    amount: 7900,
                    currency: "USD".to_string(),
                }),
            },
        ],
        location_id: Some(DEMO_LOCATION_ID.to_string()),
    }
}

#[async_trait]
impl SchedulingBackend for DemoScheduler {
    async fn list_services(&self) -> Result<ServiceCatalog, BackendError> {
        Ok(fallback_catalog())
    }

    async fn search_availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<TimeSlot>, BackendError> {
        let slots = self.slots_between(query);
        tracing::debug!(count = slots.len(), "generated demo availability");
        Ok(slots)
    }

    async fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingConfirmation, BackendError> {
        tokio::time::sleep(self.submit_delay).await;

        Ok(BookingConfirmation {
            booking: ConfirmedBooking {
                id: format!("demo-{}", uuid::Uuid::new_v4()),
                status: Some("ACCEPTED".to_string()),
                start_at: request.start_at,
                customer_id: None,
            },
            message: "Demo booking simulated; no appointment was created".to_string(),
        })
    }
}
