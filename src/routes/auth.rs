// SPDX-License-Identifier: MIT

//! Google OAuth flow routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
}

/// Start the OAuth flow - redirect to Google's authorization endpoint.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let auth_url = state.oauth.authorization_url().await?;

    tracing::info!("Starting OAuth flow, redirecting to Google");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the authorization code and store credentials.
///
/// Google redirects the browser here after consent. Without a `code`
/// parameter there is nothing to do; the user is sent back to the settings
/// screen either way, with an `oauth` query flag describing the outcome.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let admin_url = &state.config.admin_url;

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return Redirect::temporary(&format!(
            "{}?oauth=error&reason={}",
            admin_url,
            urlencoding::encode(&error)
        ));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        // Not a consent redirect; nothing to act on.
        return Redirect::temporary(admin_url);
    };

    match state.oauth.exchange_code(&code).await {
        Ok(record) => {
            tracing::info!(
                email = record.email.as_deref().unwrap_or_default(),
                "OAuth successful, credentials stored"
            );
            Redirect::temporary(&format!("{}?oauth=success", admin_url))
        }
        Err(e) => {
            tracing::error!(error = %e, "OAuth code exchange failed");
            Redirect::temporary(&format!(
                "{}?oauth=error&reason={}",
                admin_url,
                urlencoding::encode(&e.to_string())
            ))
        }
    }
}
