// SPDX-License-Identifier: MIT

//! GA4 Top Posts API Server
//!
//! Connects a CMS to Google Analytics 4: keeps OAuth credentials fresh,
//! pulls per-page view counts on a schedule, and maps them onto posts.

use ga4_top_posts::{
    config::Config,
    db::FirestoreDb,
    services::{AnalyticsService, OAuthService, PostMapper},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting GA4 Top Posts API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize services
    let oauth = OAuthService::new(db.clone(), config.redirect_uri());
    let analytics = AnalyticsService::new(db.clone());
    let mapper = PostMapper::new(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        oauth,
        analytics,
        mapper,
    });

    // Build router
    let app = ga4_top_posts::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ga4_top_posts=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
