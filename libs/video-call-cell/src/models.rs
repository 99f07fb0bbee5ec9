// libs/video-call-cell/src/models.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::error::ApiError;

// ==============================================================================
// CONSULTATION DOMAIN MODELS
// ==============================================================================

/// A scheduled video consultation as the backend reports it.
///
/// The client never mutates this record directly; status changes happen
/// server-side through the join/end/cancel endpoints and are observed by
/// re-fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub consultation_id: Uuid,
    pub encounter_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: DoctorAssignment,

    pub scheduled_start_time: DateTime<Utc>,
    pub scheduled_end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    pub status: ConsultationStatus,

    // Opaque session-routing token minted by the backend
    pub channel_name: String,

    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub patient_joined_at: Option<DateTime<Utc>>,
    pub doctor_joined_at: Option<DateTime<Utc>>,

    // Post-call artifacts, populated server-side after completion
    pub recording_url: Option<String>,
    pub recording_duration_seconds: Option<i32>,
    pub transcription_status: Option<String>,
    pub transcription_text: Option<String>,

    pub patient_notes: Option<String>,
    pub doctor_notes: Option<String>,
    pub cancellation_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Consultation {
    /// The interval during which joining the call is allowed.
    pub fn join_window(&self, config: &CallSessionConfig) -> (DateTime<Utc>, DateTime<Utc>) {
        let opens_at =
            self.scheduled_start_time - Duration::minutes(config.join_open_minutes_before_start);
        let closes_at =
            self.scheduled_start_time + Duration::minutes(config.join_close_minutes_after_start);
        (opens_at, closes_at)
    }

    /// Whether a join attempt is allowed right now.
    ///
    /// Terminal consultations are never joinable. The time window applies on
    /// top of that unless `enforce_join_window` is off.
    pub fn can_join_now(&self, now: DateTime<Utc>, config: &CallSessionConfig) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if !config.enforce_join_window {
            return true;
        }
        let (opens_at, closes_at) = self.join_window(config);
        now >= opens_at && now <= closes_at
    }
}

/// Doctor slot on a consultation. The backend leaves it unset until triage
/// assigns one, so absence is a first-class state rather than a null check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Uuid>", into = "Option<Uuid>")]
pub enum DoctorAssignment {
    Assigned(Uuid),
    Unassigned,
}

impl DoctorAssignment {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            DoctorAssignment::Assigned(id) => Some(*id),
            DoctorAssignment::Unassigned => None,
        }
    }
}

impl From<Option<Uuid>> for DoctorAssignment {
    fn from(value: Option<Uuid>) -> Self {
        match value {
            Some(id) => DoctorAssignment::Assigned(id),
            None => DoctorAssignment::Unassigned,
        }
    }
}

impl From<DoctorAssignment> for Option<Uuid> {
    fn from(value: DoctorAssignment) -> Self {
        value.id()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationStatus {
    Scheduled,
    Waiting,      // One party joined, waiting for the other
    InProgress,   // Both parties joined at least once
    Completed,
    Cancelled,
    NoShow,
}

impl ConsultationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Completed
                | ConsultationStatus::Cancelled
                | ConsultationStatus::NoShow
        )
    }

    /// Allowed forward edges of the status lifecycle. Statuses only move
    /// forward; a terminal consultation never becomes live again.
    pub fn can_transition_to(&self, next: ConsultationStatus) -> bool {
        use ConsultationStatus::*;
        match self {
            Scheduled => matches!(next, Waiting | InProgress | Cancelled | NoShow),
            Waiting => matches!(next, InProgress | Completed | Cancelled | NoShow),
            InProgress => matches!(next, Completed | NoShow),
            Completed | Cancelled | NoShow => false,
        }
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationStatus::Scheduled => write!(f, "SCHEDULED"),
            ConsultationStatus::Waiting => write!(f, "WAITING"),
            ConsultationStatus::InProgress => write!(f, "IN_PROGRESS"),
            ConsultationStatus::Completed => write!(f, "COMPLETED"),
            ConsultationStatus::Cancelled => write!(f, "CANCELLED"),
            ConsultationStatus::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

// ==============================================================================
// JOIN CREDENTIALS
// ==============================================================================

/// Short-lived credentials for one join attempt, minted by the backend.
/// Requested fresh per attempt and never persisted client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinCredentials {
    pub app_id: String,
    pub channel_name: String,
    pub token: String,
    pub uid: u32,
    pub consultation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_url: Option<String>,
}

/// Backend acknowledgement of an end report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEndReport {
    pub message: String,
    pub consultation_id: Uuid,
    pub duration_seconds: Option<i64>,
    pub status: ConsultationStatus,
}

// ==============================================================================
// LIVE SESSION STATE
// ==============================================================================

/// Lifecycle phase of the live call session. Peer presence is a sub-state of
/// `Connected` (see [`CallSnapshot::remote_peer`]), not a phase of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Idle,
    Initializing,
    Joining,
    Connected,
    Ending,
    Closed,
    Failed,
    Cancelled,
}

impl CallPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallPhase::Closed | CallPhase::Failed | CallPhase::Cancelled
        )
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallPhase::Idle => "idle",
            CallPhase::Initializing => "initializing",
            CallPhase::Joining => "joining",
            CallPhase::Connected => "connected",
            CallPhase::Ending => "ending",
            CallPhase::Closed => "closed",
            CallPhase::Failed => "failed",
            CallPhase::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// Immutable view of the live session, published to consumers on every
/// change. Exists only while a call screen does; nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSnapshot {
    pub phase: CallPhase,
    pub remote_peer: Option<u32>,
    pub audio_muted: bool,
    pub video_muted: bool,
    pub speaker_on: bool,
    pub elapsed_seconds: u64,
    /// Terminal failure description when `phase` is `Failed`.
    pub failure: Option<String>,
}

impl Default for CallSnapshot {
    fn default() -> Self {
        Self {
            phase: CallPhase::Idle,
            remote_peer: None,
            audio_muted: false,
            video_muted: false,
            speaker_on: false,
            elapsed_seconds: 0,
            failure: None,
        }
    }
}

impl CallSnapshot {
    pub fn peer_present(&self) -> bool {
        self.remote_peer.is_some()
    }
}

/// Tunables for one call session. Defaults mirror the backend's join rules.
#[derive(Debug, Clone)]
pub struct CallSessionConfig {
    pub join_open_minutes_before_start: i64,
    pub join_close_minutes_after_start: i64,
    pub join_attempt_timeout_seconds: u64,
    pub enforce_join_window: bool,
}

impl Default for CallSessionConfig {
    fn default() -> Self {
        Self {
            join_open_minutes_before_start: 15,
            join_close_minutes_after_start: 60,
            join_attempt_timeout_seconds: 30,
            enforce_join_window: true,
        }
    }
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VideoCallError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Media engine error ({code}): {message}")]
    Engine { code: i32, message: String },

    #[error("Join attempt timed out after {seconds}s")]
    JoinTimeout { seconds: u64 },

    #[error("Join window closed (opens {opens_at}, closes {closes_at})")]
    JoinWindowClosed {
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    },

    #[error("Consultation already {status}")]
    ConsultationOver { status: ConsultationStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_consultation(status: ConsultationStatus, start: DateTime<Utc>) -> Consultation {
        Consultation {
            consultation_id: Uuid::new_v4(),
            encounter_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: DoctorAssignment::Assigned(Uuid::new_v4()),
            scheduled_start_time: start,
            scheduled_end_time: Some(start + Duration::minutes(30)),
            duration_minutes: 30,
            status,
            channel_name: "vc_0123456789abcdef_00c0ffee".to_string(),
            actual_start_time: None,
            actual_end_time: None,
            patient_joined_at: None,
            doctor_joined_at: None,
            recording_url: None,
            recording_duration_seconds: None,
            transcription_status: None,
            transcription_text: None,
            patient_notes: None,
            doctor_notes: None,
            cancellation_reason: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_status_lifecycle_moves_forward_only() {
        use ConsultationStatus::*;

        assert!(Scheduled.can_transition_to(Waiting));
        assert!(Scheduled.can_transition_to(InProgress));
        assert!(Waiting.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));

        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!NoShow.can_transition_to(Waiting));
        assert!(!InProgress.can_transition_to(Scheduled));
        assert!(!InProgress.can_transition_to(Cancelled));
    }

    #[test]
    fn test_status_terminal_set() {
        use ConsultationStatus::*;

        for status in [Completed, Cancelled, NoShow] {
            assert!(status.is_terminal());
        }
        for status in [Scheduled, Waiting, InProgress] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn test_status_wire_format_is_uppercase() {
        let encoded = serde_json::to_string(&ConsultationStatus::InProgress).unwrap();
        assert_eq!(encoded, "\"IN_PROGRESS\"");

        let decoded: ConsultationStatus = serde_json::from_str("\"NO_SHOW\"").unwrap();
        assert_eq!(decoded, ConsultationStatus::NoShow);
    }

    #[test]
    fn test_join_window_boundaries() {
        let config = CallSessionConfig::default();
        let start = Utc::now();
        let consultation = test_consultation(ConsultationStatus::Scheduled, start);

        // Opens 15 minutes before, closes 60 after
        assert!(consultation.can_join_now(start - Duration::minutes(15), &config));
        assert!(consultation.can_join_now(start, &config));
        assert!(consultation.can_join_now(start + Duration::minutes(60), &config));

        assert!(!consultation.can_join_now(start - Duration::minutes(16), &config));
        assert!(!consultation.can_join_now(start + Duration::minutes(61), &config));
    }

    #[test]
    fn test_join_window_skipped_when_not_enforced() {
        let config = CallSessionConfig {
            enforce_join_window: false,
            ..Default::default()
        };
        let start = Utc::now() + Duration::hours(5);
        let consultation = test_consultation(ConsultationStatus::Scheduled, start);

        assert!(consultation.can_join_now(Utc::now(), &config));
    }

    #[test]
    fn test_terminal_consultation_never_joinable() {
        let config = CallSessionConfig {
            enforce_join_window: false,
            ..Default::default()
        };
        let consultation = test_consultation(ConsultationStatus::Cancelled, Utc::now());

        assert!(!consultation.can_join_now(Utc::now(), &config));
    }

    #[test]
    fn test_doctor_assignment_wire_format() {
        let id = Uuid::new_v4();
        let assigned: DoctorAssignment = serde_json::from_str(&format!("\"{}\"", id)).unwrap();
        assert_eq!(assigned, DoctorAssignment::Assigned(id));

        let unassigned: DoctorAssignment = serde_json::from_str("null").unwrap();
        assert_eq!(unassigned, DoctorAssignment::Unassigned);
        assert_eq!(serde_json::to_value(unassigned).unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_call_snapshot_defaults_to_idle() {
        let snapshot = CallSnapshot::default();
        assert_eq!(snapshot.phase, CallPhase::Idle);
        assert!(!snapshot.peer_present());
        assert_eq!(snapshot.elapsed_seconds, 0);
    }
}
