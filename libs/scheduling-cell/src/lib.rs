// libs/scheduling-cell/src/lib.rs
//! # Scheduling Cell
//!
//! Booking-side companion to the video call cell: schedules consultations,
//! lists and partitions them for agenda views, cancels unstarted ones, looks
//! up the bookable doctor roster and pulls consultation statistics.
//!
//! All operations go through `shared-api::ApiClient` against the televisit
//! backend; cancellation is delegated to the video call cell's session broker
//! so its conflict semantics are defined once.

pub mod models;
pub mod services;

// Re-export commonly used types
pub use models::{
    ConsultationFilter, ConsultationListItem, ConsultationStats, DoctorListing,
    ScheduleConsultationRequest, SchedulingError,
};

pub use services::{ConsultationSchedulingService, DoctorRosterService};
