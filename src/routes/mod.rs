// SPDX-License-Identifier: MIT

//! HTTP route handlers.

pub mod admin;
pub mod auth;
pub mod site;
pub mod tasks;

use crate::middleware::require_admin;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Origin (scheme://host[:port]) of a URL: everything before the path.
///
/// The admin URL points at a page (e.g. `/settings`), but the browser's
/// `Origin` header never carries a path, so the comparison must use the
/// origin alone.
fn origin_of(url: &str) -> &str {
    match url.find("://") {
        Some(scheme_end) => match url[scheme_end + 3..].find('/') {
            Some(path_start) => &url[..scheme_end + 3 + path_start],
            None => url,
        },
        None => url,
    }
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from the admin frontend's origin and
    // localhost (for dev). Exact match only; a prefix test would admit
    // lookalike origins.
    let admin_origin = origin_of(&state.config.admin_url).to_string();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == admin_origin
                    || origin_str == "http://localhost"
                    || origin_str.starts_with("http://localhost:")
                    || origin_str == "http://127.0.0.1"
                    || origin_str.starts_with("http://127.0.0.1:")
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(site::routes())
        .merge(tasks::routes()); // Scheduled-job handlers (called by Cloud Scheduler)

    // Admin routes (bearer token required)
    let admin_routes =
        admin::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
