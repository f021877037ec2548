pub mod availability;
pub mod booking;
pub mod review;
pub mod service;

pub use availability::{AppointmentSegment, AvailabilityQuery, MonthKey, TimeSlot};
pub use booking::{BookingConfirmation, BookingRequest, ConfirmedBooking, CustomerInfo};
pub use review::{ModerationAction, Review, ReviewStatus, ReviewSubmission};
pub use service::{Money, Service, ServiceCatalog};
