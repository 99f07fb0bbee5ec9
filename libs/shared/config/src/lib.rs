use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub auth_token: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("TELEVISIT_API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("TELEVISIT_API_BASE_URL not set, using default");
                    "http://localhost:8000".to_string()
                }),
            auth_token: env::var("TELEVISIT_AUTH_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("TELEVISIT_AUTH_TOKEN not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty() && !self.auth_token.is_empty()
    }
}
