// SPDX-License-Identifier: MIT

//! Scheduled-job routes, called hourly by Cloud Scheduler.
//!
//! These run unattended: every failure is logged and swallowed, and the
//! handlers always answer 200 so the scheduler never retries (a missed run
//! is made up an hour later anyway).

use crate::config::{DEFAULT_POST_TYPE, SCHEDULER_HEADER, SYNC_PAGE_LIMIT};
use crate::services::MappingOutcome;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

/// Scheduled-job routes (called by Cloud Scheduler).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/refresh-token", post(refresh_token))
        .route("/tasks/update-post-views", post(update_post_views))
}

/// Verify the request came through Cloud Scheduler. The platform strips
/// the header from external traffic, so its presence guarantees internal
/// origin.
fn from_scheduler(headers: &axum::http::HeaderMap) -> bool {
    headers.contains_key(SCHEDULER_HEADER)
}

/// Hourly access-token refresh. Self-guarded: no-op while the stored token
/// is still valid or when no refresh token exists.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> StatusCode {
    if !from_scheduler(&headers) {
        tracing::warn!("Blocked unauthorized access to refresh_token task");
        return StatusCode::FORBIDDEN;
    }

    state.oauth.refresh_if_expired().await;

    StatusCode::OK
}

/// Hourly view-count sync: fetch the top pages for the selected property
/// and overwrite matching posts' view-count metadata.
async fn update_post_views(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Response {
    if !from_scheduler(&headers) {
        tracing::warn!("Blocked unauthorized access to update_post_views task");
        return StatusCode::FORBIDDEN.into_response();
    }

    let record = match state.db.get_credentials().await {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::info!("No credential record stored, skipping view-count sync");
            return Json(MappingOutcome::default()).into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load credentials for view-count sync");
            return Json(MappingOutcome::default()).into_response();
        }
    };

    if !record.is_connected() {
        tracing::info!("Not connected, skipping view-count sync");
        return Json(MappingOutcome::default()).into_response();
    }

    let Some(property_id) = record.property_id.filter(|p| !p.is_empty()) else {
        tracing::info!("No property selected, skipping view-count sync");
        return Json(MappingOutcome::default()).into_response();
    };

    let Some(stats) = state
        .analytics
        .top_pages(&property_id, SYNC_PAGE_LIMIT)
        .await
    else {
        tracing::error!("No GA data available for view-count sync");
        return Json(MappingOutcome::default()).into_response();
    };

    let outcome = state
        .mapper
        .apply_view_counts(&stats, DEFAULT_POST_TYPE)
        .await;

    tracing::info!(
        updated = outcome.updated.len(),
        unmatched = outcome.unmatched.len(),
        errors = outcome.errors,
        "View-count sync complete"
    );

    Json(outcome).into_response()
}
