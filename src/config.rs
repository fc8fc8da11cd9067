// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! The Google OAuth client id/secret are NOT config: they are user-supplied
//! through the admin settings surface and live in the credential record.

use std::env;

/// Header set by Cloud Scheduler on scheduled-job requests. The platform
/// strips it from external traffic, so its presence guarantees internal
/// origin.
pub const SCHEDULER_HEADER: &str = "x-cloudscheduler";

/// Post type the scheduled view-count sync maps GA paths onto.
pub const DEFAULT_POST_TYPE: &str = "post";

/// How many GA pages the scheduled sync fetches per run.
pub const SYNC_PAGE_LIMIT: u32 = 100;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Externally visible base URL of this service, used to build the OAuth
    /// redirect URI (`{public_url}/auth/google/callback`)
    pub public_url: String,
    /// Admin frontend URL the browser is sent back to after OAuth
    pub admin_url: String,
    /// Bearer token protecting the admin routes
    pub admin_token: String,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            public_url: "http://localhost:8080".to_string(),
            admin_url: "http://localhost:5173/settings".to_string(),
            admin_token: "test_admin_token".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            public_url: env::var("PUBLIC_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            admin_url: env::var("ADMIN_URL")
                .unwrap_or_else(|_| "http://localhost:5173/settings".to_string()),
            admin_token: env::var("ADMIN_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ADMIN_TOKEN"))?,
            port,
        })
    }

    /// Redirect URI registered with Google for the OAuth flow.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/google/callback", self.public_url)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
