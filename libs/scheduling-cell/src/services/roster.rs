// libs/scheduling-cell/src/services/roster.rs
use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, instrument};

use shared_api::ApiClient;
use shared_config::AppConfig;

use crate::models::{DoctorListing, SchedulingError};

/// Looks up doctors a patient can book a consultation with.
pub struct DoctorRosterService {
    api: Arc<ApiClient>,
}

impl DoctorRosterService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api: Arc::new(ApiClient::new(config)),
        }
    }

    pub fn with_client(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Lists active doctors, optionally narrowed to one specialty. An empty
    /// roster is a valid answer, not an error.
    #[instrument(skip(self, auth_token))]
    pub async fn list_available(
        &self,
        specialty: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<DoctorListing>, SchedulingError> {
        let path = match specialty {
            Some(specialty) => format!(
                "/api/encounters/available-doctors?specialty={}",
                urlencoding::encode(specialty)
            ),
            None => "/api/encounters/available-doctors".to_string(),
        };

        let doctors: Vec<DoctorListing> = self
            .api
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        debug!("Roster returned {} doctors", doctors.len());
        Ok(doctors)
    }
}
