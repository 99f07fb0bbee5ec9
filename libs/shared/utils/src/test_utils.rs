use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub api_base_url: String,
    pub auth_token: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            auth_token: "test-bearer-token".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            auth_token: self.auth_token.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned backend payloads matching the platform API wire shapes, for
/// wiremock-backed tests across the cells.
pub struct MockBackendResponses;

impl MockBackendResponses {
    pub fn consultation_response(
        consultation_id: Uuid,
        doctor_id: Uuid,
        status: &str,
        scheduled_start_time: DateTime<Utc>,
    ) -> serde_json::Value {
        json!({
            "consultation_id": consultation_id,
            "encounter_id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "scheduled_start_time": scheduled_start_time,
            "scheduled_end_time": scheduled_start_time + Duration::minutes(30),
            "duration_minutes": 30,
            "status": status,
            "channel_name": "vc_0123456789abcdef_00c0ffee",
            "actual_start_time": null,
            "actual_end_time": null,
            "patient_joined_at": null,
            "doctor_joined_at": null,
            "recording_url": null,
            "recording_duration_seconds": null,
            "transcription_status": null,
            "transcription_text": null,
            "patient_notes": "Recurring headaches",
            "doctor_notes": null,
            "cancellation_reason": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn consultation_list_item(
        consultation_id: Uuid,
        doctor_id: Uuid,
        status: &str,
        scheduled_start_time: DateTime<Utc>,
    ) -> serde_json::Value {
        json!({
            "consultation_id": consultation_id,
            "encounter_id": Uuid::new_v4(),
            "scheduled_start_time": scheduled_start_time,
            "duration_minutes": 30,
            "status": status,
            "doctor_id": doctor_id,
            "doctor_name": "Dr. Sarah Chen",
            "patient_notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn join_credentials_response(consultation_id: Uuid) -> serde_json::Value {
        json!({
            "app_id": "test-app-id",
            "channel_name": "vc_0123456789abcdef_00c0ffee",
            "token": "007test-rtc-token",
            "uid": 12345678,
            "consultation_id": consultation_id,
            "call_url": null
        })
    }

    pub fn end_response(consultation_id: Uuid, duration_seconds: i64) -> serde_json::Value {
        json!({
            "message": "Consultation ended successfully",
            "consultation_id": consultation_id,
            "duration_seconds": duration_seconds,
            "status": "COMPLETED"
        })
    }

    pub fn cancel_response(consultation_id: Uuid) -> serde_json::Value {
        json!({
            "message": "Consultation cancelled successfully",
            "consultation_id": consultation_id
        })
    }

    pub fn doctor_profile_response(user_id: Uuid) -> serde_json::Value {
        json!({
            "user_id": user_id,
            "first_name": "Sarah",
            "last_name": "Chen",
            "email": "sarah.chen@example.com",
            "phone": "+15550100",
            "address": "100 Clinic Way",
            "hospital_name": "Amae General",
            "specialty": "Cardiology",
            "degree": "MD",
            "last_degree_year": 2015,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn stats_response() -> serde_json::Value {
        json!({
            "total_scheduled": 12,
            "total_completed": 8,
            "total_cancelled": 2,
            "total_no_show": 1,
            "upcoming_count": 3,
            "average_duration_minutes": 27.5
        })
    }

    pub fn error_detail(message: &str) -> serde_json::Value {
        json!({
            "detail": message
        })
    }
}
