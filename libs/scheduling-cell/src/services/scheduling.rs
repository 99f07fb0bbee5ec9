// libs/scheduling-cell/src/services/scheduling.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_api::ApiClient;
use shared_config::AppConfig;
use video_call_cell::models::Consultation;
use video_call_cell::services::{HttpSessionBroker, SessionBroker};

use crate::models::{
    ConsultationFilter, ConsultationListItem, ConsultationStats, ScheduleConsultationRequest,
    SchedulingError,
};

/// Books and manages video consultations against the televisit backend.
pub struct ConsultationSchedulingService {
    api: Arc<ApiClient>,
}

impl ConsultationSchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api: Arc::new(ApiClient::new(config)),
        }
    }

    pub fn with_client(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Schedules a new consultation. The request is validated locally first;
    /// a doctor double-booking surfaces as a `Conflict` from the backend.
    #[instrument(skip(self, auth_token))]
    pub async fn schedule(
        &self,
        request: &ScheduleConsultationRequest,
        auth_token: &str,
    ) -> Result<Consultation, SchedulingError> {
        request.validate(Utc::now())?;

        info!(
            "Scheduling consultation with doctor {} at {}",
            request.doctor_id, request.scheduled_start_time
        );

        let payload = json!({
            "doctor_id": request.doctor_id,
            "scheduled_start_time": request.scheduled_start_time.to_rfc3339(),
            "duration_minutes": request.duration_minutes,
            "patient_notes": request.patient_notes,
        });

        let consultation: Consultation = self
            .api
            .request(
                Method::POST,
                "/api/video-consultations/",
                Some(auth_token),
                Some(payload),
            )
            .await?;

        info!(
            "Consultation {} scheduled on channel {}",
            consultation.consultation_id, consultation.channel_name
        );
        Ok(consultation)
    }

    /// Lists the caller's consultations. The backend orders by
    /// `scheduled_start_time` descending and that order is preserved.
    #[instrument(skip(self, auth_token))]
    pub async fn list_mine(
        &self,
        filter: &ConsultationFilter,
        auth_token: &str,
    ) -> Result<Vec<ConsultationListItem>, SchedulingError> {
        let path = format!(
            "/api/video-consultations/my-consultations{}",
            filter.to_query()
        );
        debug!("Fetching consultations: {}", path);

        let items: Vec<ConsultationListItem> = self
            .api
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(items)
    }

    /// Fetches one consultation, e.g. when re-entering the call screen.
    #[instrument(skip(self, auth_token))]
    pub async fn get(
        &self,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<Consultation, SchedulingError> {
        debug!("Fetching consultation {}", consultation_id);

        let path = format!("/api/video-consultations/{}", consultation_id);
        let consultation: Consultation = self
            .api
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(consultation)
    }

    /// Cancels a consultation that has not started. Goes through the session
    /// broker so cancellation semantics live in one place.
    #[instrument(skip(self, auth_token))]
    pub async fn cancel(
        &self,
        consultation_id: Uuid,
        reason: &str,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        info!("Cancelling consultation {}", consultation_id);

        let broker = HttpSessionBroker::with_client(self.api.clone(), auth_token.to_string());
        broker.report_cancel(consultation_id, reason).await?;
        Ok(())
    }

    /// Aggregate consultation counts for the caller.
    #[instrument(skip(self, auth_token))]
    pub async fn my_stats(&self, auth_token: &str) -> Result<ConsultationStats, SchedulingError> {
        let stats: ConsultationStats = self
            .api
            .request(
                Method::GET,
                "/api/video-consultations/stats/my-stats",
                Some(auth_token),
                None,
            )
            .await?;
        Ok(stats)
    }

    /// Splits a consultation list into upcoming and past buckets, preserving
    /// the incoming order within each bucket.
    pub fn partition(
        items: Vec<ConsultationListItem>,
        now: DateTime<Utc>,
    ) -> (Vec<ConsultationListItem>, Vec<ConsultationListItem>) {
        items.into_iter().partition(|item| item.is_upcoming(now))
    }
}
