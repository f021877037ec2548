pub mod cache;
pub mod calendar;
pub mod dates;
pub mod reviews;
pub mod scheduler;
pub mod validation;
pub mod wizard;
