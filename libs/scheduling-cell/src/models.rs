// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::ApiError;
use video_call_cell::models::{ConsultationStatus, DoctorAssignment, VideoCallError};

// ==============================================================================
// SCHEDULING REQUESTS
// ==============================================================================

/// Consultation lengths the backend accepts, in minutes.
pub const ALLOWED_DURATIONS_MINUTES: [i32; 4] = [15, 30, 45, 60];

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleConsultationRequest {
    pub doctor_id: Uuid,
    pub scheduled_start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_notes: Option<String>,
}

impl ScheduleConsultationRequest {
    /// Client-side checks before the request goes on the wire.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), SchedulingError> {
        if self.scheduled_start_time <= now {
            return Err(SchedulingError::Validation(
                "scheduled_start_time must be in the future".to_string(),
            ));
        }
        if !ALLOWED_DURATIONS_MINUTES.contains(&self.duration_minutes) {
            return Err(SchedulingError::Validation(format!(
                "duration_minutes must be one of {:?}",
                ALLOWED_DURATIONS_MINUTES
            )));
        }
        Ok(())
    }
}

// ==============================================================================
// LIST & FILTER MODELS
// ==============================================================================

/// Brief consultation info as returned by `my-consultations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationListItem {
    pub consultation_id: Uuid,
    pub encounter_id: Uuid,
    pub scheduled_start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: ConsultationStatus,
    pub doctor_id: DoctorAssignment,
    pub doctor_name: Option<String>,
    pub patient_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConsultationListItem {
    /// Whether this entry belongs in the upcoming bucket. A call that is
    /// waiting or running stays upcoming even past its scheduled start.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            ConsultationStatus::Waiting | ConsultationStatus::InProgress => true,
            ConsultationStatus::Scheduled => self.scheduled_start_time >= now,
            ConsultationStatus::Completed
            | ConsultationStatus::Cancelled
            | ConsultationStatus::NoShow => false,
        }
    }
}

/// Server-side filters for `my-consultations`.
#[derive(Debug, Clone, Default)]
pub struct ConsultationFilter {
    pub status: Option<ConsultationStatus>,
    pub upcoming_only: bool,
    pub limit: Option<u32>,
}

impl ConsultationFilter {
    pub fn upcoming() -> Self {
        Self {
            status: None,
            upcoming_only: true,
            limit: None,
        }
    }

    pub fn with_status(status: ConsultationStatus) -> Self {
        Self {
            status: Some(status),
            upcoming_only: false,
            limit: None,
        }
    }

    /// Query string for the list endpoint, empty when nothing is set.
    pub fn to_query(&self) -> String {
        let mut params = Vec::new();
        if let Some(status) = &self.status {
            params.push(format!("status_filter={}", status));
        }
        if self.upcoming_only {
            params.push("upcoming_only=true".to_string());
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }
        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

// ==============================================================================
// ROSTER & STATS MODELS
// ==============================================================================

/// A doctor a patient can book, from the encounters roster endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorListing {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialty: Option<String>,
    pub hospital_name: Option<String>,
}

impl DoctorListing {
    /// Display name in the same shape the backend puts in `doctor_name`.
    pub fn display_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationStats {
    pub total_scheduled: i64,
    pub total_completed: i64,
    pub total_cancelled: i64,
    pub total_no_show: i64,
    pub upcoming_count: i64,
    pub average_duration_minutes: Option<f64>,
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid request: {0}")]
    Validation(String),
}

impl From<VideoCallError> for SchedulingError {
    fn from(error: VideoCallError) -> Self {
        match error {
            VideoCallError::Api(api) => SchedulingError::Api(api),
            other => SchedulingError::Validation(other.to_string()),
        }
    }
}
