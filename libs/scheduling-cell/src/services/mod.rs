// libs/scheduling-cell/src/services/mod.rs

pub mod roster;
pub mod scheduling;

pub use roster::DoctorRosterService;
pub use scheduling::ConsultationSchedulingService;
