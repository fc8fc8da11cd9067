// SPDX-License-Identifier: MIT

//! Google OAuth token lifecycle: obtain, store, refresh, disconnect.
//!
//! Handles:
//! - Authorization URL construction
//! - Authorization-code exchange (plus best-effort userinfo fetch)
//! - Scheduled token refresh, self-guarded on the expiry check
//! - Disconnect (clears the stored connection)

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::CredentialRecord;
use serde::Deserialize;

/// Google's OAuth authorization endpoint.
const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";

/// The only scope this service ever requests.
const SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Build the authorization URL the browser is sent to. Deterministic, no
/// side effects: offline access with forced consent so a refresh token is
/// always granted.
pub fn build_authorization_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&access_type=offline&prompt=consent",
        AUTH_ENDPOINT,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(SCOPE),
    )
}

/// Tokens granted by a code exchange or refresh.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds from now
    pub expires_in: i64,
    /// Absent on refresh grants, and on repeat consent
    pub refresh_token: Option<String>,
}

/// Token endpoint response. Google reports failures as a 4xx with an
/// `error`/`error_description` body, so every field is optional.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: i64,
    refresh_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}

/// Low-level client for Google's token and userinfo endpoints.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    token_url: String,
    userinfo_url: String,
}

impl Default for GoogleOAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleOAuthClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
        }
    }

    /// Client pointed at alternative endpoints (stub servers in tests).
    pub fn with_endpoints(token_url: String, userinfo_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url,
            userinfo_url,
        }
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, AppError> {
        self.token_grant(&[
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, AppError> {
        self.token_grant(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn token_grant(&self, form: &[(&str, &str)]) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Token request failed: {}", e)))?;

        // Grant failures arrive as a 4xx with an error body; inspect the
        // body rather than the status so the upstream message survives.
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Token response parse error: {}", e)))?;

        if let Some(error) = body.error {
            let description = body.error_description.unwrap_or_default();
            return Err(AppError::OAuth(format!("{}: {}", error, description)));
        }

        let access_token = match body.access_token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AppError::TokenMissing),
        };

        Ok(TokenGrant {
            access_token,
            expires_in: body.expires_in,
            refresh_token: body.refresh_token.filter(|t| !t.is_empty()),
        })
    }

    /// Fetch the connected account's email address.
    pub async fn fetch_email(&self, access_token: &str) -> Result<Option<String>, AppError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!("Userinfo HTTP {}", status)));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Userinfo parse error: {}", e)))?;

        Ok(info.email.filter(|e| !e.is_empty()))
    }
}

/// High-level OAuth manager operating on the stored credential record.
#[derive(Clone)]
pub struct OAuthService {
    client: GoogleOAuthClient,
    db: FirestoreDb,
    redirect_uri: String,
}

impl OAuthService {
    pub fn new(db: FirestoreDb, redirect_uri: String) -> Self {
        Self {
            client: GoogleOAuthClient::new(),
            db,
            redirect_uri,
        }
    }

    /// Service backed by a custom client (stub endpoints in tests).
    pub fn with_client(client: GoogleOAuthClient, db: FirestoreDb, redirect_uri: String) -> Self {
        Self {
            client,
            db,
            redirect_uri,
        }
    }

    /// Authorization URL for the stored client id.
    pub async fn authorization_url(&self) -> Result<String, AppError> {
        let record = self.db.get_credentials().await?.unwrap_or_default();
        if !record.has_client_credentials() {
            return Err(AppError::ConfigMissing("client_id / client_secret"));
        }
        let client_id = record.client_id.unwrap_or_default();
        Ok(build_authorization_url(&client_id, &self.redirect_uri))
    }

    /// Exchange an authorization code and persist the resulting record.
    ///
    /// The stored record is rebuilt: client credentials carry over, the
    /// token fields and email are fresh, and the property selection is
    /// reset (it is re-chosen on the settings form after connecting).
    pub async fn exchange_code(&self, code: &str) -> Result<CredentialRecord, AppError> {
        let current = self.db.get_credentials().await?.unwrap_or_default();
        if !current.has_client_credentials() {
            return Err(AppError::ConfigMissing("client_id / client_secret"));
        }
        let client_id = current.client_id.clone().unwrap_or_default();
        let client_secret = current.client_secret.clone().unwrap_or_default();

        let grant = self
            .client
            .exchange_code(code, &client_id, &client_secret, &self.redirect_uri)
            .await?;

        // Best-effort: a failed userinfo fetch is not a failed connection.
        let email = match self.client.fetch_email(&grant.access_token).await {
            Ok(Some(email)) => email,
            Ok(None) => "Unknown".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Userinfo fetch failed, storing Unknown");
                "Unknown".to_string()
            }
        };

        let record = CredentialRecord {
            client_id: Some(client_id),
            client_secret: Some(client_secret),
            access_token: Some(grant.access_token),
            refresh_token: grant.refresh_token,
            expires_at: Some(chrono::Utc::now().timestamp() + grant.expires_in),
            email: Some(email),
            property_id: None,
        };

        self.db.set_credentials(&record).await?;

        tracing::info!(
            email = record.email.as_deref().unwrap_or_default(),
            "OAuth code exchange complete, credentials stored"
        );

        Ok(record)
    }

    /// Refresh the access token if it has expired.
    ///
    /// Safe to call unconditionally: no-op without a refresh token or while
    /// the current token is still valid. Runs unattended on a schedule, so
    /// every failure is logged and swallowed; the stored record is only
    /// touched on a successful refresh, and only `access_token` and
    /// `expires_at` change.
    pub async fn refresh_if_expired(&self) {
        let mut record = match self.db.get_credentials().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("No credential record stored, skipping refresh");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load credentials for refresh");
                return;
            }
        };

        if !record.can_refresh() {
            tracing::debug!("No refresh token available, skipping refresh");
            return;
        }
        if !record.refresh_due(chrono::Utc::now()) {
            return;
        }

        let refresh_token = record.refresh_token.clone().unwrap_or_default();
        let client_id = record.client_id.clone().unwrap_or_default();
        let client_secret = record.client_secret.clone().unwrap_or_default();

        let grant = match self
            .client
            .refresh_token(&refresh_token, &client_id, &client_secret)
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                tracing::error!(error = %e, "Failed to refresh access token");
                return;
            }
        };

        record.access_token = Some(grant.access_token);
        record.expires_at = Some(chrono::Utc::now().timestamp() + grant.expires_in);

        match self.db.set_credentials(&record).await {
            Ok(()) => tracing::info!("Access token refreshed"),
            Err(e) => tracing::error!(error = %e, "Failed to store refreshed token"),
        }
    }

    /// Remove the stored connection, keeping client credentials and the
    /// property selection intact.
    pub async fn disconnect(&self) -> Result<(), AppError> {
        let mut record = self.db.get_credentials().await?.unwrap_or_default();
        record.clear_connection();
        self.db.set_credentials(&record).await?;

        tracing::info!("Disconnected from Google Analytics");
        Ok(())
    }
}
