// SPDX-License-Identifier: MIT

//! Admin routes backing the settings screen.
//!
//! These return pure data; rendering belongs to the CMS frontend. The
//! overview endpoint composes the same fetches the original settings page
//! made inline: property selector tree, top-10 table, worst-10 table.

use axum::{
    extract::{Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::config::DEFAULT_POST_TYPE;
use crate::error::{AppError, Result};
use crate::models::{AccountTree, PageStat, Post};
use crate::services::mapper::MappedPage;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/settings", get(get_settings).put(update_settings))
        .route("/admin/overview", get(get_overview))
        .route("/admin/analytics/top-pages", get(get_top_pages))
        .route("/admin/analytics/worst-posts", get(get_worst_posts))
        .route("/admin/posts", put(sync_posts))
        .route("/auth/disconnect", post(disconnect))
}

const TABLE_LIMIT: u32 = 10;

// ─── Settings ────────────────────────────────────────────────

/// Connection status for the settings screen. Never echoes the secret.
#[derive(Serialize)]
pub struct ConnectionStatus {
    pub client_credentials_set: bool,
    pub connected: bool,
    pub email: Option<String>,
    pub property_id: Option<String>,
}

async fn connection_status(state: &AppState) -> Result<ConnectionStatus> {
    let record = state.db.get_credentials().await?.unwrap_or_default();
    Ok(ConnectionStatus {
        client_credentials_set: record.has_client_credentials(),
        connected: record.is_connected(),
        email: record.email,
        property_id: record.property_id,
    })
}

/// Get connection status.
async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<ConnectionStatus>> {
    Ok(Json(connection_status(&state).await?))
}

/// Merge-update of the user-editable settings fields. Fields absent from
/// the request are preserved; an empty `property_id` clears the selection.
#[derive(Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, max = 200))]
    pub client_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub client_secret: Option<String>,
    #[validate(length(max = 50))]
    pub property_id: Option<String>,
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<ConnectionStatus>> {
    // Trim first so the length constraints apply to what gets stored; a
    // whitespace-only credential must not pass as non-empty.
    let request = UpdateSettingsRequest {
        client_id: request.client_id.map(|v| v.trim().to_string()),
        client_secret: request.client_secret.map(|v| v.trim().to_string()),
        property_id: request.property_id.map(|v| v.trim().to_string()),
    };
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut record = state.db.get_credentials().await?.unwrap_or_default();

    if let Some(client_id) = request.client_id {
        record.client_id = Some(client_id);
    }
    if let Some(client_secret) = request.client_secret {
        record.client_secret = Some(client_secret);
    }
    if let Some(property_id) = request.property_id {
        record.property_id = (!property_id.is_empty()).then_some(property_id);
    }

    state.db.set_credentials(&record).await?;

    connection_status(&state).await.map(Json)
}

// ─── Settings-screen composition ─────────────────────────────

/// Everything the settings screen shows in one response. `null` sections
/// mean "unavailable" (not connected or upstream failure, logged), which
/// the frontend renders as a hint rather than an error page.
#[derive(Serialize)]
pub struct OverviewResponse {
    pub connection: ConnectionStatus,
    pub accounts: Option<AccountTree>,
    pub top_pages: Option<Vec<PageStat>>,
    pub worst_posts: Option<Vec<MappedPage>>,
}

async fn get_overview(State(state): State<Arc<AppState>>) -> Result<Json<OverviewResponse>> {
    let connection = connection_status(&state).await?;

    let accounts = state.analytics.account_tree().await;

    // A stored empty string is "no selection", same as the table handlers.
    let (top_pages, worst_posts) = match connection.property_id.as_deref().filter(|p| !p.is_empty())
    {
        Some(property_id) => {
            let top = state.analytics.top_pages(property_id, TABLE_LIMIT).await;
            // Worst table is mapped for display, never persisted.
            let worst = match state.analytics.worst_pages(property_id, TABLE_LIMIT).await {
                Some(pages) => Some(state.mapper.map_pages(&pages, DEFAULT_POST_TYPE).await),
                None => None,
            };
            (top, worst)
        }
        None => (None, None),
    };

    Ok(Json(OverviewResponse {
        connection,
        accounts,
        top_pages,
        worst_posts,
    }))
}

// ─── Individual tables ───────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct TableParams {
    #[serde(default = "default_table_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
}

fn default_table_limit() -> u32 {
    TABLE_LIMIT
}

#[derive(Serialize)]
pub struct TopPagesResponse {
    pub pages: Option<Vec<PageStat>>,
}

async fn get_top_pages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TableParams>,
) -> Result<Json<TopPagesResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let record = state.db.get_credentials().await?.unwrap_or_default();
    let property_id = record
        .property_id
        .filter(|p| !p.is_empty())
        .ok_or(AppError::ConfigMissing("property_id"))?;

    let pages = state.analytics.top_pages(&property_id, params.limit).await;
    Ok(Json(TopPagesResponse { pages }))
}

#[derive(Serialize)]
pub struct WorstPostsResponse {
    pub posts: Option<Vec<MappedPage>>,
}

async fn get_worst_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TableParams>,
) -> Result<Json<WorstPostsResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let record = state.db.get_credentials().await?.unwrap_or_default();
    let property_id = record
        .property_id
        .filter(|p| !p.is_empty())
        .ok_or(AppError::ConfigMissing("property_id"))?;

    let posts = match state.analytics.worst_pages(&property_id, params.limit).await {
        Some(pages) => Some(state.mapper.map_pages(&pages, DEFAULT_POST_TYPE).await),
        None => None,
    };

    Ok(Json(WorstPostsResponse { posts }))
}

// ─── CMS post sync ───────────────────────────────────────────

#[derive(Serialize)]
pub struct SyncPostsResponse {
    pub synced: usize,
}

/// Bulk upsert of posts mirrored from the CMS. This is how the `posts`
/// collection is populated; the view-count fields are left to the
/// scheduled sync.
async fn sync_posts(
    State(state): State<Arc<AppState>>,
    Json(posts): Json<Vec<Post>>,
) -> Result<Json<SyncPostsResponse>> {
    state.db.batch_upsert_posts(&posts).await?;

    tracing::info!(count = posts.len(), "Synced posts from CMS");

    Ok(Json(SyncPostsResponse {
        synced: posts.len(),
    }))
}

// ─── Disconnect ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
}

/// Disconnect from Google Analytics. Clears exactly the token fields and
/// the connected email; client credentials and the property selection
/// survive.
async fn disconnect(State(state): State<Arc<AppState>>) -> Result<Json<DisconnectResponse>> {
    state.oauth.disconnect().await?;
    Ok(Json(DisconnectResponse { success: true }))
}
