// libs/video-call-cell/src/services/broker.rs
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use shared_api::ApiClient;
use shared_config::AppConfig;
use shared_models::auth::CallRole;
use shared_models::error::ApiError;

use crate::models::{CallEndReport, Consultation, ConsultationStatus, JoinCredentials};

/// Backend boundary for session lifecycle calls.
///
/// The controller only talks to the backend through this seam, so tests can
/// swap in a mock and the HTTP mapping stays in one place.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionBroker: Send + Sync {
    /// Fetches the current consultation record.
    async fn fetch_consultation(&self, consultation_id: Uuid) -> Result<Consultation, ApiError>;

    /// Requests fresh join credentials for one attempt. Server-side this may
    /// move the consultation to WAITING or IN_PROGRESS.
    async fn request_join(
        &self,
        consultation_id: Uuid,
        role: CallRole,
    ) -> Result<JoinCredentials, ApiError>;

    /// Reports the call as ended. Idempotent: reporting an already-completed
    /// consultation is success, not an error.
    async fn report_end(&self, consultation_id: Uuid) -> Result<CallEndReport, ApiError>;

    /// Cancels a consultation that has not started.
    async fn report_cancel(&self, consultation_id: Uuid, reason: &str) -> Result<(), ApiError>;
}

/// `SessionBroker` over the platform REST API.
///
/// Holds the caller's bearer token for the lifetime of the session; where the
/// token comes from is not this crate's concern.
pub struct HttpSessionBroker {
    api: Arc<ApiClient>,
    auth_token: String,
}

impl HttpSessionBroker {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api: Arc::new(ApiClient::new(config)),
            auth_token: config.auth_token.clone(),
        }
    }

    /// Shares an existing client instead of building a new one.
    pub fn with_client(api: Arc<ApiClient>, auth_token: impl Into<String>) -> Self {
        Self {
            api,
            auth_token: auth_token.into(),
        }
    }
}

#[async_trait]
impl SessionBroker for HttpSessionBroker {
    #[instrument(skip(self))]
    async fn fetch_consultation(&self, consultation_id: Uuid) -> Result<Consultation, ApiError> {
        self.api
            .request::<Consultation>(
                Method::GET,
                &format!("/api/video-consultations/{}", consultation_id),
                Some(&self.auth_token),
                None,
            )
            .await
    }

    #[instrument(skip(self))]
    async fn request_join(
        &self,
        consultation_id: Uuid,
        role: CallRole,
    ) -> Result<JoinCredentials, ApiError> {
        info!(
            "Requesting join credentials for consultation {} as {}",
            consultation_id, role
        );

        self.api
            .request::<JoinCredentials>(
                Method::POST,
                &format!("/api/video-consultations/{}/join", consultation_id),
                Some(&self.auth_token),
                Some(json!({ "user_type": role })),
            )
            .await
    }

    #[instrument(skip(self))]
    async fn report_end(&self, consultation_id: Uuid) -> Result<CallEndReport, ApiError> {
        info!("Reporting end of consultation {}", consultation_id);

        let result = self
            .api
            .request::<CallEndReport>(
                Method::POST,
                &format!("/api/video-consultations/{}/end", consultation_id),
                Some(&self.auth_token),
                None,
            )
            .await;

        match result {
            // Already ended by the other party; the call is over either way
            Err(ApiError::Conflict(message)) => {
                info!(
                    "Consultation {} already ended ({}), treating as success",
                    consultation_id, message
                );
                Ok(CallEndReport {
                    message,
                    consultation_id,
                    duration_seconds: None,
                    status: ConsultationStatus::Completed,
                })
            }
            other => other,
        }
    }

    #[instrument(skip(self))]
    async fn report_cancel(&self, consultation_id: Uuid, reason: &str) -> Result<(), ApiError> {
        info!("Cancelling consultation {}", consultation_id);

        self.api
            .request::<Value>(
                Method::POST,
                &format!("/api/video-consultations/{}/cancel", consultation_id),
                Some(&self.auth_token),
                Some(json!({ "cancellation_reason": reason })),
            )
            .await?;

        Ok(())
    }
}
