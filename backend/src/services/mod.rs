//! Business logic services for the School Food Supply platform

pub mod average;
pub mod calendar;
pub mod requirement;
pub mod substitution;

pub use average::AverageService;
pub use calendar::CalendarService;
pub use requirement::RequirementService;
pub use substitution::SubstitutionService;
