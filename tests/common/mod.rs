// SPDX-License-Identifier: MIT

use ga4_top_posts::config::Config;
use ga4_top_posts::db::FirestoreDb;
use ga4_top_posts::models::Post;
use ga4_top_posts::routes::create_router;
use ga4_top_posts::services::{AnalyticsService, OAuthService, PostMapper};
use ga4_top_posts::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Build a router and shared state around the given database and services.
#[allow(dead_code)]
pub fn build_app(
    config: Config,
    db: FirestoreDb,
    oauth: OAuthService,
    analytics: AnalyticsService,
) -> (axum::Router, Arc<AppState>) {
    let mapper = PostMapper::new(db.clone());
    let state = Arc::new(AppState {
        config,
        db,
        oauth,
        analytics,
        mapper,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let db = test_db_offline();
    let oauth = OAuthService::new(db.clone(), config.redirect_uri());
    let analytics = AnalyticsService::new(db.clone());

    build_app(config, db, oauth, analytics)
}

/// Serve a stub upstream on an ephemeral port; returns its base URL.
#[allow(dead_code)]
pub async fn spawn_stub(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub listener");
    let addr = listener.local_addr().expect("Stub listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub server failed");
    });

    format!("http://{}", addr)
}

/// Generate a unique post ID for test isolation.
#[allow(dead_code)]
pub fn unique_post_id() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
}

/// Helper to create a basic test post with no view count yet.
#[allow(dead_code)]
pub fn test_post(id: u64, slug: &str, post_type: &str) -> Post {
    Post {
        id,
        title: format!("Title for {}", slug),
        slug: slug.to_string(),
        post_type: post_type.to_string(),
        permalink: format!("https://example.com/blog/{}/", slug),
        ga_page_views: None,
        views_updated_at: None,
    }
}
