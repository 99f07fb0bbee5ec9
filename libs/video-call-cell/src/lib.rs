// libs/video-call-cell/src/lib.rs
//! # Video Call Cell
//!
//! This cell drives the client side of a real-time video consultation: it
//! exchanges join credentials with the televisit backend, steers an RTC media
//! engine through one call, and exposes the live call state to whatever
//! surface renders it.
//!
//! ## Features
//!
//! - **Session Brokering**: Join/end/cancel reporting against the backend
//! - **Engine Adapters**: One trait over the RTC engine, with a scriptable
//!   in-process engine for development and tests
//! - **Call Lifecycle**: A single session loop owning phase transitions,
//!   peer presence, the duration ticker and the join deadline
//! - **State Snapshots**: A watch channel any consumer can subscribe to
//! - **Guaranteed Cleanup**: The engine is released exactly once on every
//!   exit path, including navigation away and join timeouts
//!
//! ## Architecture
//!
//! The video call cell follows the established cell architecture pattern:
//!
//! ```text
//! +-----------------------------------------------------+
//! |                  Video Call Cell                    |
//! +-----------------------------------------------------+
//! |  models.rs      |  Consultations, phases, snapshots |
//! |  services/      |  Business logic layer             |
//! |    broker.rs    |  Backend credential exchange      |
//! |    engine.rs    |  Media engine trait + simulator   |
//! |    controller.rs|  Call session state machine       |
//! +-----------------------------------------------------+
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use shared_config::AppConfig;
//! use shared_models::auth::CallRole;
//! use uuid::Uuid;
//! use video_call_cell::models::{CallPhase, CallSessionConfig};
//! use video_call_cell::services::{
//!     CallSessionController, HttpSessionBroker, SimulatedMediaEngine,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = AppConfig::from_env();
//! let broker = Arc::new(HttpSessionBroker::new(&config));
//! let engine = Arc::new(SimulatedMediaEngine::new());
//!
//! let controller =
//!     CallSessionController::new(broker, engine, CallSessionConfig::default());
//! let mut session = controller.launch(Uuid::new_v4(), CallRole::Patient);
//!
//! session.start().await;
//! let snapshot = session.wait_for_phase(CallPhase::Connected).await;
//! println!("call is {}", snapshot.phase);
//!
//! session.end().await;
//! session.closed().await;
//! # }
//! ```

pub mod models;
pub mod services;

// Re-export commonly used types
pub use models::{
    CallEndReport, CallPhase, CallSessionConfig, CallSnapshot, Consultation, ConsultationStatus,
    DoctorAssignment, JoinCredentials, VideoCallError,
};

pub use services::{
    CallSession, CallSessionController, HttpSessionBroker, MediaEngine, SessionBroker,
    SimulatedMediaEngine,
};
