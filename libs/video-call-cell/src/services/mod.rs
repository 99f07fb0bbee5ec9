// libs/video-call-cell/src/services/mod.rs

pub mod broker;
pub mod controller;
pub mod engine;

pub use broker::{HttpSessionBroker, SessionBroker};
pub use controller::{CallSession, CallSessionController};
pub use engine::{MediaEngine, SimulatedMediaEngine};
