// SPDX-License-Identifier: MIT

//! The single credential record connecting this site to Google Analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth credentials and GA4 property selection, stored as one settings
/// document. Created empty at install; the code exchange fills the token
/// fields, the scheduled refresh mutates `access_token`/`expires_at`, and
/// the settings form sets `property_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Google OAuth client ID (user-supplied)
    #[serde(default)]
    pub client_id: Option<String>,
    /// Google OAuth client secret (user-supplied)
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Short-lived access token
    #[serde(default)]
    pub access_token: Option<String>,
    /// Long-lived refresh token; absent means refresh is impossible
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds after which `access_token` is no longer trustworthy
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Display identity of the connected Google account
    #[serde(default)]
    pub email: Option<String>,
    /// Selected GA4 property; absent means no report data can be fetched
    #[serde(default)]
    pub property_id: Option<String>,
}

impl CredentialRecord {
    /// Both client id and secret are present and non-empty.
    pub fn has_client_credentials(&self) -> bool {
        self.client_id.as_deref().is_some_and(|v| !v.is_empty())
            && self.client_secret.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// An access token is stored (it may still be expired).
    pub fn is_connected(&self) -> bool {
        self.access_token.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// A refresh token is stored.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// The access token has reached its expiry. A record without an expiry
    /// counts as expired.
    pub fn refresh_due(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now.timestamp() >= expires_at,
            None => true,
        }
    }

    /// Drop the connection fields, keeping client credentials and the
    /// selected property intact.
    pub fn clear_connection(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.expires_at = None;
        self.email = None;
    }
}
