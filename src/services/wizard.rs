//! Four-step booking wizard: service, date and time, contact details, review.
//!
//! All session state lives in [`BookingWizard`]. Availability is cached per
//! month; when the live scheduling backend fails the wizard switches to the
//! demo backend for the rest of the session.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::errors::{BackendError, WizardError};
use crate::models::{
    AvailabilityQuery, BookingConfirmation, BookingRequest, CustomerInfo, MonthKey, Service,
    ServiceCatalog, TimeSlot,
};
use crate::services::cache::AvailabilityCache;
use crate::services::calendar::{DaySlots, MonthGrid};
use crate::services::dates;
use crate::services::scheduler::SchedulingBackend;
use crate::services::validation::{split_name, ContactValidation};

pub const FALLBACK_PHONE: &str = "(781) 408-2506";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ServiceSelect,
    DateTimeSelect,
    CustomerInfo,
    ReviewConfirm,
    Success,
}

impl Step {
    /// 1-based position shown in the progress bar; `None` once booked.
    pub fn number(&self) -> Option<u8> {
        match self {
            Step::ServiceSelect => Some(1),
            Step::DateTimeSelect => Some(2),
            Step::CustomerInfo => Some(3),
            Step::ReviewConfirm => Some(4),
            Step::Success => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::ServiceSelect => "Choose a service",
            Step::DateTimeSelect => "Pick a date and time",
            Step::CustomerInfo => "Your contact details",
            Step::ReviewConfirm => "Review and confirm",
            Step::Success => "You're booked",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardSelection {
    pub service: Option<Service>,
    pub date: Option<NaiveDate>,
    pub slot: Option<TimeSlot>,
    pub customer: CustomerInfo,
}

/// Read-only recap shown before submitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSummary {
    pub service_name: String,
    pub price_label: Option<String>,
    pub duration_minutes: i64,
    pub date_label: String,
    pub time_label: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Booked(BookingConfirmation),
    /// Structured error from the backend, shown verbatim.
    Rejected(String),
    /// Transport failure; the message points the customer to the phone line.
    Failed(String),
}

/// Holds the submitting flag up for as long as a booking call is in flight.
struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

pub struct BookingWizard {
    live: Box<dyn SchedulingBackend>,
    demo: Box<dyn SchedulingBackend>,
    offset: FixedOffset,
    fixed_now: Option<DateTime<FixedOffset>>,
    step: Step,
    demo_mode: bool,
    catalog: ServiceCatalog,
    selection: WizardSelection,
    cache: AvailabilityCache,
    visible_month: MonthKey,
    submitting: bool,
    last_error: Option<String>,
    confirmation: Option<BookingConfirmation>,
}

impl BookingWizard {
    pub fn new(
        live: Box<dyn SchedulingBackend>,
        demo: Box<dyn SchedulingBackend>,
        offset: FixedOffset,
    ) -> Self {
        let today = dates::now_in(offset).date_naive();
        Self {
            live,
            demo,
            offset,
            fixed_now: None,
            step: Step::ServiceSelect,
            demo_mode: false,
            catalog: ServiceCatalog::default(),
            selection: WizardSelection::default(),
            cache: AvailabilityCache::new(offset),
            visible_month: MonthKey::from_date(today),
            submitting: false,
            last_error: None,
            confirmation: None,
        }
    }

    /// Pin "now" instead of reading the system clock.
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.fixed_now = Some(now);
        self.visible_month = MonthKey::from_date(self.today());
        self
    }

    /// Start without trying the live backend at all.
    pub fn in_demo_mode(mut self) -> Self {
        self.demo_mode = true;
        self
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.fixed_now
            .map(|t| t.with_timezone(&self.offset))
            .unwrap_or_else(|| dates::now_in(self.offset))
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn is_demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub fn selection(&self) -> &WizardSelection {
        &self.selection
    }

    pub fn services(&self) -> &[Service] {
        &self.catalog.services
    }

    pub fn visible_month(&self) -> MonthKey {
        self.visible_month
    }

    pub fn cache(&self) -> &AvailabilityCache {
        &self.cache
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn confirmation(&self) -> Option<&BookingConfirmation> {
        self.confirmation.as_ref()
    }

    /// Whether the confirm control is active.
    pub fn submit_enabled(&self) -> bool {
        self.step == Step::ReviewConfirm && !self.submitting
    }

    fn enter_demo_mode(&mut self, reason: &str) {
        if !self.demo_mode {
            tracing::warn!(reason, "scheduling backend unavailable, switching to demo mode");
            self.demo_mode = true;
        }
    }

    // ── Step 1: service ──

    pub async fn load_services(&mut self) -> &[Service] {
        if !self.demo_mode {
            match self.live.list_services().await {
                Ok(catalog) if !catalog.services.is_empty() => {
                    tracing::info!(count = catalog.services.len(), "loaded services");
                    self.catalog = catalog;
                    return &self.catalog.services;
                }
                Ok(_) => self.enter_demo_mode("no bookable services configured"),
                Err(e) => self.enter_demo_mode(&e.to_string()),
            }
        }

        // the demo backend never fails
        self.catalog = self.demo.list_services().await.unwrap_or_default();
        &self.catalog.services
    }

    /// Choose a service. Picking a different one drops the selected date and
    /// slot and every cached month, since availability is per service.
    pub fn select_service(&mut self, service_id: &str) -> Result<(), WizardError> {
        if self.step != Step::ServiceSelect {
            return Err(WizardError::WrongStep);
        }
        let service = self
            .catalog
            .find(service_id)
            .cloned()
            .ok_or_else(|| WizardError::UnknownService(service_id.to_string()))?;

        if self.selection.service.as_ref().map(|s| s.id.as_str()) == Some(service_id) {
            return Ok(());
        }

        self.selection.service = Some(service);
        self.selection.date = None;
        self.selection.slot = None;
        self.cache.clear();
        Ok(())
    }

    // ── Navigation ──

    /// Whether the forward control of the current step is enabled.
    pub fn can_advance(&self) -> bool {
        match self.step {
            Step::ServiceSelect => self.selection.service.is_some(),
            Step::DateTimeSelect => self.selection.date.is_some() && self.selection.slot.is_some(),
            Step::CustomerInfo => self.validation().all_valid(),
            Step::ReviewConfirm | Step::Success => false,
        }
    }

    pub async fn next(&mut self) -> Result<Step, WizardError> {
        if matches!(self.step, Step::ReviewConfirm | Step::Success) {
            return Err(WizardError::WrongStep);
        }
        if !self.can_advance() {
            return Err(WizardError::StepIncomplete);
        }

        match self.step {
            Step::ServiceSelect => {
                self.step = Step::DateTimeSelect;
                self.visible_month = MonthKey::from_date(self.today());
                self.get_month(self.visible_month).await;
            }
            Step::DateTimeSelect => self.step = Step::CustomerInfo,
            Step::CustomerInfo => self.step = Step::ReviewConfirm,
            Step::ReviewConfirm | Step::Success => {}
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> Result<Step, WizardError> {
        self.step = match self.step {
            Step::DateTimeSelect => Step::ServiceSelect,
            Step::CustomerInfo => Step::DateTimeSelect,
            Step::ReviewConfirm => Step::CustomerInfo,
            Step::ServiceSelect | Step::Success => return Err(WizardError::WrongStep),
        };
        self.last_error = None;
        Ok(self.step)
    }

    /// "Edit" from the review page jumps straight back to the service list.
    pub fn edit(&mut self) -> Result<Step, WizardError> {
        if self.step != Step::ReviewConfirm {
            return Err(WizardError::WrongStep);
        }
        self.step = Step::ServiceSelect;
        self.last_error = None;
        Ok(self.step)
    }

    // ── Step 2: availability ──

    fn availability_query(&self, key: MonthKey) -> Option<AvailabilityQuery> {
        let service = self.selection.service.as_ref()?;
        let (start_at, end_at) = dates::month_bounds(key, self.offset);
        Some(AvailabilityQuery {
            service_variation_id: service
                .variation_id
                .clone()
                .unwrap_or_else(|| service.id.clone()),
            start_at,
            end_at,
            location_id: self.catalog.location_id.clone().unwrap_or_default(),
        })
    }

    /// Slots for a month, fetched or synthesized once and then served from the cache.
    pub async fn get_month(&mut self, key: MonthKey) -> &[TimeSlot] {
        if !self.cache.contains(key) {
            if let Some(query) = self.availability_query(key) {
                let slots = self.fetch_month(key, &query).await;
                self.cache.insert(key, slots);
            }
        }
        self.cache.get(key).unwrap_or_default()
    }

    async fn fetch_month(&mut self, key: MonthKey, query: &AvailabilityQuery) -> Vec<TimeSlot> {
        if !self.demo_mode {
            let live_ready = self
                .selection
                .service
                .as_ref()
                .is_some_and(|s| s.variation_id.is_some())
                && !query.location_id.is_empty();

            if !live_ready {
                self.enter_demo_mode("service variation or location missing");
            } else {
                match self.live.search_availability(query).await {
                    Ok(slots) => {
                        tracing::info!(month = %key, count = slots.len(), "fetched availability");
                        return slots;
                    }
                    Err(e) => self.enter_demo_mode(&e.to_string()),
                }
            }
        }

        self.demo
            .search_availability(query)
            .await
            .unwrap_or_default()
    }

    pub async fn show_next_month(&mut self) -> Result<MonthKey, WizardError> {
        if self.step != Step::DateTimeSelect {
            return Err(WizardError::WrongStep);
        }
        self.visible_month = self.visible_month.next();
        self.get_month(self.visible_month).await;
        Ok(self.visible_month)
    }

    pub async fn show_previous_month(&mut self) -> Result<MonthKey, WizardError> {
        if self.step != Step::DateTimeSelect {
            return Err(WizardError::WrongStep);
        }
        let prev = self.visible_month.prev();
        if prev < MonthKey::from_date(self.today()) {
            return Err(WizardError::MonthInPast);
        }
        self.visible_month = prev;
        self.get_month(self.visible_month).await;
        Ok(self.visible_month)
    }

    pub fn month_grid(&self) -> MonthGrid {
        MonthGrid::build(
            self.visible_month,
            &self.cache,
            self.now(),
            self.selection.date,
        )
    }

    /// Select a day. Past days are refused; a day without slots is selected
    /// but yields [`DaySlots::NoSlots`] and keeps the step incomplete.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<DaySlots, WizardError> {
        if self.step != Step::DateTimeSelect {
            return Err(WizardError::WrongStep);
        }
        if date < self.today() {
            return Err(WizardError::DateUnavailable(date));
        }
        if self.selection.date != Some(date) {
            self.selection.slot = None;
        }
        self.selection.date = Some(date);
        Ok(self.day_slots())
    }

    pub fn day_slots(&self) -> DaySlots {
        let Some(date) = self.selection.date else {
            return DaySlots::NoDateSelected;
        };
        let slots: Vec<TimeSlot> = self
            .cache
            .upcoming_slots_on(date, self.now())
            .into_iter()
            .cloned()
            .collect();
        if slots.is_empty() {
            DaySlots::NoSlots
        } else {
            DaySlots::Slots(slots)
        }
    }

    /// Select the slot starting at `start_at` on the selected day, replacing any previous one.
    pub fn select_slot(&mut self, start_at: DateTime<FixedOffset>) -> Result<(), WizardError> {
        if self.step != Step::DateTimeSelect {
            return Err(WizardError::WrongStep);
        }
        let DaySlots::Slots(slots) = self.day_slots() else {
            return Err(WizardError::UnknownSlot(start_at.to_rfc3339()));
        };
        let slot = slots
            .into_iter()
            .find(|s| s.start_at == start_at)
            .ok_or_else(|| WizardError::UnknownSlot(start_at.to_rfc3339()))?;
        self.selection.slot = Some(slot);
        Ok(())
    }

    // ── Step 3: contact details ──

    pub fn set_name(&mut self, value: &str) {
        self.selection.customer.name = value.to_string();
    }

    pub fn set_phone(&mut self, value: &str) {
        self.selection.customer.phone = value.to_string();
    }

    pub fn set_email(&mut self, value: &str) {
        self.selection.customer.email = value.to_string();
    }

    pub fn set_notes(&mut self, value: &str) {
        self.selection.customer.notes = value.to_string();
    }

    pub fn validation(&self) -> ContactValidation {
        ContactValidation::check(&self.selection.customer)
    }

    // ── Step 4: review and submit ──

    pub fn summary(&self) -> Option<ReviewSummary> {
        let service = self.selection.service.as_ref()?;
        let slot = self.selection.slot.as_ref()?;
        let start = slot.local_start(self.offset);
        let customer = &self.selection.customer;
        let notes = customer.notes.trim();

        Some(ReviewSummary {
            service_name: service.name.clone(),
            price_label: service.price_label(),
            duration_minutes: slot.duration_minutes().unwrap_or(service.duration_minutes),
            date_label: dates::format_date_long(start.date_naive()),
            time_label: dates::format_time(&start),
            name: customer.name.trim().to_string(),
            phone: customer.phone.trim().to_string(),
            email: customer.email.trim().to_string(),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        })
    }

    fn booking_request(&self) -> Option<BookingRequest> {
        let service = self.selection.service.as_ref()?;
        let slot = self.selection.slot.as_ref()?;
        let customer = &self.selection.customer;
        let (first_name, last_name) = split_name(customer.name.trim());
        let notes = customer.notes.trim();

        Some(BookingRequest {
            service_variation_id: service.variation_id.clone(),
            service_variation_version: service.variation_version,
            duration_minutes: Some(service.duration_minutes),
            location_id: self.catalog.location_id.clone(),
            start_at: Some(slot.start_at),
            team_member_id: slot.team_member_id().map(|s| s.to_string()),
            customer_first_name: Some(first_name),
            customer_last_name: Some(last_name),
            customer_email: Some(customer.email.trim().to_string()),
            customer_phone: Some(customer.phone.trim().to_string()),
            customer_note: (!notes.is_empty()).then(|| notes.to_string()),
        })
    }

    /// Send the booking. The submitting flag is raised before the call goes out
    /// and lowered when it returns or when this future is dropped mid-call.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, WizardError> {
        if self.step != Step::ReviewConfirm {
            return Err(WizardError::WrongStep);
        }
        if self.submitting {
            return Err(WizardError::AlreadySubmitting);
        }
        let request = self.booking_request().ok_or(WizardError::StepIncomplete)?;

        self.last_error = None;

        let backend = if self.demo_mode {
            self.demo.as_ref()
        } else {
            self.live.as_ref()
        };
        let result = {
            let _in_flight = InFlight::raise(&mut self.submitting);
            backend.create_booking(&request).await
        };

        let outcome = match result {
            Ok(confirmation) => {
                tracing::info!(booking_id = %confirmation.booking.id, demo = self.demo_mode, "booking confirmed");
                self.step = Step::Success;
                self.confirmation = Some(confirmation.clone());
                SubmitOutcome::Booked(confirmation)
            }
            Err(BackendError::Rejected { message, .. }) => {
                tracing::warn!(error = %message, "booking rejected");
                self.last_error = Some(message.clone());
                SubmitOutcome::Rejected(message)
            }
            Err(BackendError::Unavailable(reason)) => {
                tracing::error!(error = %reason, "booking request failed");
                let message = format!(
                    "We couldn't complete your booking right now. Please try again, or call us at {FALLBACK_PHONE}."
                );
                self.last_error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        };
        Ok(outcome)
    }

    /// "Book another": clear every selection and cached month and return to step 1.
    pub fn start_over(&mut self) {
        self.selection = WizardSelection::default();
        self.cache.clear();
        self.step = Step::ServiceSelect;
        self.visible_month = MonthKey::from_date(self.today());
        self.submitting = false;
        self.last_error = None;
        self.confirmation = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{Datelike, Weekday};

    use super::*;
    use crate::models::{ConfirmedBooking, Money};
    use crate::services::dates::parse_iso;
    use crate::services::scheduler::demo::DemoScheduler;

    struct MockScheduler {
        catalog: Result<ServiceCatalog, BackendError>,
        slots: Result<Vec<TimeSlot>, BackendError>,
        booking: Result<BookingConfirmation, BackendError>,
        searches: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<BookingRequest>>>,
        stall_bookings: bool,
    }

    impl MockScheduler {
        fn new() -> Self {
            Self {
                catalog: Ok(catalog()),
                slots: Ok(vec![
                    slot("2026-11-03T14:00:00-05:00"),
                    slot("2026-11-03T09:00:00-05:00"),
                    slot("2026-11-05T10:00:00-05:00"),
                ]),
                booking: Ok(BookingConfirmation {
                    booking: ConfirmedBooking {
                        id: "BK1".to_string(),
                        status: Some("ACCEPTED".to_string()),
                        start_at: None,
                        customer_id: Some("C1".to_string()),
                    },
                    message: "Booking created successfully".to_string(),
                }),
                searches: Arc::new(AtomicUsize::new(0)),
                requests: Arc::new(Mutex::new(vec![])),
                stall_bookings: false,
            }
        }
    }

    #[async_trait]
    impl SchedulingBackend for MockScheduler {
        async fn list_services(&self) -> Result<ServiceCatalog, BackendError> {
            self.catalog.clone()
        }

        async fn search_availability(
            &self,
            _query: &AvailabilityQuery,
        ) -> Result<Vec<TimeSlot>, BackendError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.slots.clone()
        }

        async fn create_booking(
            &self,
            request: &BookingRequest,
        ) -> Result<BookingConfirmation, BackendError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.stall_bookings {
                std::future::pending::<()>().await;
            }
            self.booking.clone()
        }
    }

    fn eastern() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    fn slot(start: &str) -> TimeSlot {
        TimeSlot {
            start_at: parse_iso(start).unwrap(),
            location_id: Some("L1".to_string()),
            appointment_segments: vec![crate::models::AppointmentSegment {
                duration_minutes: Some(60),
                team_member_id: Some("TM1".to_string()),
                service_variation_id: Some("V-DIAG".to_string()),
                service_variation_version: Some(5),
            }],
        }
    }

    fn service(id: &str, variation: &str) -> Service {
        Service {
            id: id.to_string(),
            name: format!("{id} service"),
            description: String::new(),
            variation_id: Some(variation.to_string()),
            variation_version: Some(5),
            duration_minutes: 60,
            price_money: Some(Money {
                amount: 7900,
                currency: "USD".to_string(),
            }),
        }
    }

    fn catalog() -> ServiceCatalog {
        ServiceCatalog {
            services: vec![service("diag", "V-DIAG"), service("tune", "V-TUNE")],
            location_id: Some("L1".to_string()),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const NOW: &str = "2026-11-01T08:00:00-05:00";

    fn demo() -> Box<DemoScheduler> {
        Box::new(
            DemoScheduler::new(eastern(), Duration::from_millis(10))
                .with_now(parse_iso(NOW).unwrap())
                .with_seed(11),
        )
    }

    fn wizard(live: MockScheduler) -> BookingWizard {
        BookingWizard::new(Box::new(live), demo(), eastern()).with_now(parse_iso(NOW).unwrap())
    }

    async fn at_date_step(live: MockScheduler) -> BookingWizard {
        let mut w = wizard(live);
        w.load_services().await;
        w.select_service("diag").unwrap();
        w.next().await.unwrap();
        w
    }

    async fn at_review_step(live: MockScheduler) -> BookingWizard {
        let mut w = at_date_step(live).await;
        w.select_date(date(2026, 11, 3)).unwrap();
        w.select_slot(parse_iso("2026-11-03T09:00:00-05:00").unwrap())
            .unwrap();
        w.next().await.unwrap();
        w.set_name("Pat Van Doe");
        w.set_phone("781-555-0100");
        w.set_email("pat@example.com");
        w.next().await.unwrap();
        w
    }

    #[tokio::test]
    async fn test_service_step_gating() {
        let mut w = wizard(MockScheduler::new());
        w.load_services().await;
        assert_eq!(w.step(), Step::ServiceSelect);
        assert!(!w.can_advance());
        assert_eq!(w.next().await, Err(WizardError::StepIncomplete));

        assert!(matches!(w.select_service("nope"), Err(WizardError::UnknownService(_))));
        w.select_service("diag").unwrap();
        assert!(w.can_advance());
    }

    #[tokio::test]
    async fn test_entering_date_step_fetches_current_month() {
        let live = MockScheduler::new();
        let searches = live.searches.clone();
        let w = at_date_step(live).await;

        assert_eq!(w.step(), Step::DateTimeSelect);
        assert_eq!(w.visible_month(), MonthKey::new(2026, 11).unwrap());
        assert!(w.cache().contains(w.visible_month()));
        assert_eq!(searches.load(Ordering::SeqCst), 1);
        assert!(!w.is_demo_mode());
    }

    #[tokio::test]
    async fn test_month_fetched_once() {
        let live = MockScheduler::new();
        let searches = live.searches.clone();
        let mut w = at_date_step(live).await;

        w.show_next_month().await.unwrap();
        w.show_previous_month().await.unwrap();
        w.get_month(MonthKey::new(2026, 12).unwrap()).await;
        assert_eq!(searches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cannot_go_before_current_month() {
        let mut w = at_date_step(MockScheduler::new()).await;
        assert_eq!(w.show_previous_month().await, Err(WizardError::MonthInPast));
        assert_eq!(w.visible_month(), MonthKey::new(2026, 11).unwrap());
    }

    #[tokio::test]
    async fn test_slots_sorted_and_exclusive() {
        let mut w = at_date_step(MockScheduler::new()).await;
        assert!(!w.can_advance());

        let DaySlots::Slots(slots) = w.select_date(date(2026, 11, 3)).unwrap() else {
            panic!("expected slots");
        };
        assert_eq!(slots.len(), 2);
        assert!(slots[0].start_at < slots[1].start_at);
        assert!(!w.can_advance());

        w.select_slot(slots[1].start_at).unwrap();
        w.select_slot(slots[0].start_at).unwrap();
        assert_eq!(w.selection().slot.as_ref(), Some(&slots[0]));
        assert!(w.can_advance());
    }

    #[tokio::test]
    async fn test_day_without_slots() {
        let mut w = at_date_step(MockScheduler::new()).await;
        assert_eq!(w.select_date(date(2026, 11, 4)).unwrap(), DaySlots::NoSlots);
        assert!(!w.month_grid().day(date(2026, 11, 4)).unwrap().available);
        assert!(!w.can_advance());
        assert!(matches!(
            w.select_slot(parse_iso("2026-11-04T09:00:00-05:00").unwrap()),
            Err(WizardError::UnknownSlot(_))
        ));
    }

    #[tokio::test]
    async fn test_today_after_its_last_slot_is_disabled() {
        let mut live = MockScheduler::new();
        live.slots = Ok(vec![
            slot("2026-11-02T09:00:00-05:00"),
            slot("2026-11-03T09:00:00-05:00"),
        ]);
        let mut w = BookingWizard::new(Box::new(live), demo(), eastern())
            .with_now(parse_iso("2026-11-02T13:00:00-05:00").unwrap());
        w.load_services().await;
        w.select_service("diag").unwrap();
        w.next().await.unwrap();

        let grid = w.month_grid();
        assert!(!grid.day(date(2026, 11, 2)).unwrap().available);
        assert!(grid.day(date(2026, 11, 3)).unwrap().available);
        assert_eq!(w.select_date(date(2026, 11, 2)).unwrap(), DaySlots::NoSlots);
    }

    #[tokio::test]
    async fn test_changing_date_clears_slot() {
        let mut w = at_date_step(MockScheduler::new()).await;
        w.select_date(date(2026, 11, 3)).unwrap();
        w.select_slot(parse_iso("2026-11-03T09:00:00-05:00").unwrap())
            .unwrap();
        w.select_date(date(2026, 11, 5)).unwrap();
        assert!(w.selection().slot.is_none());
    }

    #[tokio::test]
    async fn test_empty_month_renders_disabled() {
        let mut live = MockScheduler::new();
        live.slots = Ok(vec![]);
        let w = at_date_step(live).await;
        let grid = w.month_grid();
        assert!(grid.loaded);
        assert!(grid.days.iter().all(|d| !d.available));
    }

    #[tokio::test]
    async fn test_changing_service_invalidates() {
        let mut w = at_date_step(MockScheduler::new()).await;
        w.select_date(date(2026, 11, 3)).unwrap();
        w.select_slot(parse_iso("2026-11-03T09:00:00-05:00").unwrap())
            .unwrap();
        w.show_next_month().await.unwrap();
        assert_eq!(w.cache().len(), 2);

        w.back().unwrap();
        w.select_service("diag").unwrap();
        assert!(w.selection().slot.is_some(), "same service is a no-op");

        w.select_service("tune").unwrap();
        assert!(w.selection().date.is_none());
        assert!(w.selection().slot.is_none());
        assert!(w.cache().is_empty());
    }

    #[tokio::test]
    async fn test_live_failure_falls_back_to_demo() {
        let mut live = MockScheduler::new();
        live.slots = Err(BackendError::Unavailable("connection refused".to_string()));
        let searches = live.searches.clone();
        let mut w = at_date_step(live).await;

        assert!(w.is_demo_mode());
        assert!(!w.cache().get(w.visible_month()).unwrap().is_empty());

        // later months never touch the live backend again
        w.show_next_month().await.unwrap();
        assert_eq!(searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_payload_falls_back_to_demo() {
        let mut live = MockScheduler::new();
        live.slots = Err(BackendError::Rejected {
            status: 500,
            message: "Internal server error".to_string(),
        });
        let w = at_date_step(live).await;
        assert!(w.is_demo_mode());
    }

    #[tokio::test]
    async fn test_offline_consultation_has_weekday_availability() {
        let mut live = MockScheduler::new();
        live.catalog = Err(BackendError::Unavailable("offline".to_string()));
        let mut w = wizard(live);

        let services = w.load_services().await;
        let consult = services
            .iter()
            .find(|s| s.name == "Free Phone Consultation")
            .unwrap()
            .id
            .clone();
        assert!(w.is_demo_mode());

        w.select_service(&consult).unwrap();
        w.next().await.unwrap();

        let grid = w.month_grid();
        let open: Vec<_> = grid.available_days().collect();
        assert!(!open.is_empty());
        assert!(open.iter().all(|d| d.date.weekday() != Weekday::Sun));
        assert!(open.iter().all(|d| d.date >= w.today()));
    }

    #[tokio::test]
    async fn test_contact_gating_is_synchronous() {
        let mut w = at_date_step(MockScheduler::new()).await;
        w.select_date(date(2026, 11, 3)).unwrap();
        w.select_slot(parse_iso("2026-11-03T09:00:00-05:00").unwrap())
            .unwrap();
        w.next().await.unwrap();
        assert_eq!(w.step(), Step::CustomerInfo);

        w.set_name("Pat Doe");
        w.set_phone("781-555-0100");
        w.set_email("no-at-sign.com");
        assert!(!w.can_advance());
        assert_eq!(w.next().await, Err(WizardError::StepIncomplete));

        w.set_email("pat@example.com");
        assert!(w.can_advance());
        assert_eq!(w.next().await, Ok(Step::ReviewConfirm));
    }

    #[tokio::test]
    async fn test_back_keeps_data() {
        let mut w = at_review_step(MockScheduler::new()).await;
        assert_eq!(w.back(), Ok(Step::CustomerInfo));
        assert_eq!(w.back(), Ok(Step::DateTimeSelect));
        assert!(w.selection().slot.is_some());
        assert_eq!(w.selection().customer.email, "pat@example.com");
        assert_eq!(w.back(), Ok(Step::ServiceSelect));
        assert_eq!(w.back(), Err(WizardError::WrongStep));
    }

    #[tokio::test]
    async fn test_edit_from_review() {
        let mut w = at_review_step(MockScheduler::new()).await;
        assert_eq!(w.edit(), Ok(Step::ServiceSelect));
        assert!(w.selection().service.is_some());
        assert_eq!(w.edit(), Err(WizardError::WrongStep));
    }

    #[tokio::test]
    async fn test_summary() {
        let mut w = at_review_step(MockScheduler::new()).await;
        w.set_notes("  Furnace clicking  ");
        let summary = w.summary().unwrap();
        assert_eq!(summary.service_name, "diag service");
        assert_eq!(summary.price_label.as_deref(), Some("$79"));
        assert_eq!(summary.date_label, "Tuesday, November 3, 2026");
        assert_eq!(summary.time_label, "9:00 AM");
        assert_eq!(summary.notes.as_deref(), Some("Furnace clicking"));
    }

    #[tokio::test]
    async fn test_live_submit_success() {
        let live = MockScheduler::new();
        let requests = live.requests.clone();
        let mut w = at_review_step(live).await;

        let outcome = w.submit().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Booked(_)));
        assert_eq!(w.step(), Step::Success);
        assert_eq!(w.confirmation().unwrap().booking.id, "BK1");

        let sent = requests.lock().unwrap();
        let req = &sent[0];
        assert_eq!(req.customer_first_name.as_deref(), Some("Pat"));
        assert_eq!(req.customer_last_name.as_deref(), Some("Van Doe"));
        assert_eq!(req.service_variation_id.as_deref(), Some("V-DIAG"));
        assert_eq!(req.location_id.as_deref(), Some("L1"));
        assert_eq!(req.team_member_id.as_deref(), Some("TM1"));
        assert_eq!(req.customer_note, None);
    }

    #[tokio::test]
    async fn test_structured_error_stays_on_review() {
        let mut live = MockScheduler::new();
        live.booking = Err(BackendError::Rejected {
            status: 409,
            message: "That time is no longer available".to_string(),
        });
        let mut w = at_review_step(live).await;

        let outcome = w.submit().await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Rejected("That time is no longer available".to_string())
        );
        assert_eq!(w.step(), Step::ReviewConfirm);
        assert!(w.submit_enabled());
        assert_eq!(w.last_error(), Some("That time is no longer available"));
    }

    #[tokio::test]
    async fn test_network_error_mentions_phone() {
        let mut live = MockScheduler::new();
        live.booking = Err(BackendError::Unavailable("reset by peer".to_string()));
        let mut w = at_review_step(live).await;

        let SubmitOutcome::Failed(message) = w.submit().await.unwrap() else {
            panic!("expected a failure");
        };
        assert!(message.contains(FALLBACK_PHONE));
        assert_eq!(w.step(), Step::ReviewConfirm);
        assert!(w.submit_enabled());
        assert!(!w.is_demo_mode());
    }

    #[tokio::test]
    async fn test_demo_submit_always_succeeds() {
        let mut live = MockScheduler::new();
        live.catalog = Err(BackendError::Unavailable("offline".to_string()));
        let requests = live.requests.clone();
        let mut w = wizard(live);
        w.load_services().await;
        w.select_service("consult").unwrap();
        w.next().await.unwrap();

        let day = w.month_grid().available_days().next().unwrap().date;
        let DaySlots::Slots(slots) = w.select_date(day).unwrap() else {
            panic!("available day without slots");
        };
        w.select_slot(slots[0].start_at).unwrap();
        w.next().await.unwrap();
        w.set_name("Cher");
        w.set_phone("5551234");
        w.set_email("a@.");
        w.next().await.unwrap();

        let outcome = w.submit().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Booked(_)));
        assert_eq!(w.step(), Step::Success);
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_submit_reenables_confirm() {
        let mut live = MockScheduler::new();
        live.stall_bookings = true;
        let requests = live.requests.clone();
        let mut w = at_review_step(live).await;

        let attempt = tokio::time::timeout(Duration::from_millis(20), w.submit()).await;
        assert!(attempt.is_err());
        assert_eq!(requests.lock().unwrap().len(), 1);

        assert_eq!(w.step(), Step::ReviewConfirm);
        assert!(w.submit_enabled());
    }

    #[tokio::test]
    async fn test_submit_only_from_review() {
        let mut w = at_date_step(MockScheduler::new()).await;
        assert_eq!(w.submit().await, Err(WizardError::WrongStep));
    }

    #[tokio::test]
    async fn test_start_over_resets_everything() {
        let mut w = at_review_step(MockScheduler::new()).await;
        w.submit().await.unwrap();
        assert_eq!(w.next().await, Err(WizardError::WrongStep));
        assert_eq!(w.back(), Err(WizardError::WrongStep));

        w.start_over();
        assert_eq!(w.step(), Step::ServiceSelect);
        assert_eq!(w.selection(), &WizardSelection::default());
        assert!(w.cache().is_empty());
        assert!(w.confirmation().is_none());
        assert!(!w.services().is_empty());
    }

    #[test]
    fn test_step_numbers() {
        assert_eq!(Step::ServiceSelect.number(), Some(1));
        assert_eq!(Step::ReviewConfirm.number(), Some(4));
        assert_eq!(Step::Success.number(), None);
    }
}
