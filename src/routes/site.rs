// SPDX-License-Identifier: MIT

//! Public routes (the shortcode surface).

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::config::DEFAULT_POST_TYPE;
use crate::error::{AppError, Result};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/site/top-posts", get(top_posts))
}

#[derive(Deserialize, Validate)]
pub struct TopPostsParams {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    #[serde(default = "default_post_type")]
    #[validate(length(min = 1, max = 50))]
    pub post_type: String,
}

fn default_limit() -> u32 {
    5
}

fn default_post_type() -> String {
    DEFAULT_POST_TYPE.to_string()
}

#[derive(Serialize)]
pub struct TopPostEntry {
    pub title: String,
    pub permalink: String,
    pub views: i64,
}

#[derive(Serialize)]
pub struct TopPostsResponse {
    pub posts: Vec<TopPostEntry>,
}

/// Top posts by persisted view count.
///
/// Reads only the metadata the scheduled sync wrote; no network access, so
/// upstream unavailability cannot affect this route.
async fn top_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopPostsParams>,
) -> Result<Json<TopPostsResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let posts = state
        .db
        .top_posts_by_views(&params.post_type, params.limit)
        .await?;

    Ok(Json(TopPostsResponse {
        posts: posts
            .into_iter()
            .map(|p| TopPostEntry {
                title: p.title,
                permalink: p.permalink,
                views: p.ga_page_views.unwrap_or(0),
            })
            .collect(),
    }))
}
