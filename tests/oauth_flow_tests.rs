// SPDX-License-Identifier: MIT

//! OAuth lifecycle tests: code exchange, scheduled refresh, disconnect.
//!
//! Google's endpoints are replaced with in-process stubs; the credential
//! record is stored in the Firestore emulator. The record lives in a single
//! document, so tests in this file serialize on a shared lock.

use axum::{routing::get, routing::post, Form, Json, Router};
use ga4_top_posts::models::CredentialRecord;
use ga4_top_posts::services::{GoogleOAuthClient, OAuthService};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

mod common;

static CREDENTIALS_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

const REDIRECT_URI: &str = "http://localhost:8080/auth/google/callback";

/// A record as it looks after the user saved client credentials and picked
/// a property on an earlier connection.
fn seeded_record() -> CredentialRecord {
    CredentialRecord {
        client_id: Some("client-123".to_string()),
        client_secret: Some("secret-456".to_string()),
        access_token: Some("at_old".to_string()),
        refresh_token: Some("rt_old".to_string()),
        expires_at: Some(chrono::Utc::now().timestamp() - 60),
        email: Some("old@example.com".to_string()),
        property_id: Some("555".to_string()),
    }
}

/// Stub token endpoint returning a fixed grant, counting its hits.
fn token_stub(hits: Arc<AtomicU32>, grant: serde_json::Value) -> Router {
    Router::new().route(
        "/token",
        post(move |Form(form): Form<HashMap<String, String>>| {
            let hits = hits.clone();
            let grant = grant.clone();
            async move {
                assert!(form.contains_key("grant_type"));
                hits.fetch_add(1, Ordering::SeqCst);
                Json(grant)
            }
        }),
    )
}

fn userinfo_stub(email: &str) -> Router {
    let body = json!({ "email": email });
    Router::new().route(
        "/userinfo",
        get(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    )
}

fn service_with_stubs(
    db: ga4_top_posts::db::FirestoreDb,
    token_base: &str,
    userinfo_base: &str,
) -> OAuthService {
    let client = GoogleOAuthClient::with_endpoints(
        format!("{}/token", token_base),
        format!("{}/userinfo", userinfo_base),
    );
    OAuthService::with_client(client, db, REDIRECT_URI.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Code exchange
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_exchange_rebuilds_stored_record() {
    require_emulator!();
    let _guard = CREDENTIALS_LOCK.lock().await;

    let db = common::test_db().await;
    db.set_credentials(&seeded_record()).await.unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let token_base = common::spawn_stub(token_stub(
        hits,
        json!({ "access_token": "at_new", "expires_in": 3600, "refresh_token": "rt_new" }),
    ))
    .await;
    let userinfo_base = common::spawn_stub(userinfo_stub("user@example.com")).await;

    let oauth = service_with_stubs(db.clone(), &token_base, &userinfo_base);
    let before = chrono::Utc::now().timestamp();
    oauth.exchange_code("code-abc").await.unwrap();

    let stored = db.get_credentials().await.unwrap().unwrap();
    assert_eq!(stored.client_id.as_deref(), Some("client-123"));
    assert_eq!(stored.client_secret.as_deref(), Some("secret-456"));
    assert_eq!(stored.access_token.as_deref(), Some("at_new"));
    assert_eq!(stored.refresh_token.as_deref(), Some("rt_new"));
    assert_eq!(stored.email.as_deref(), Some("user@example.com"));
    assert!(stored.expires_at.unwrap() >= before + 3600);

    // Reconnecting means re-choosing the property on the settings form.
    assert_eq!(stored.property_id, None);
}

#[tokio::test]
async fn test_exchange_stores_unknown_email_when_userinfo_fails() {
    require_emulator!();
    let _guard = CREDENTIALS_LOCK.lock().await;

    let db = common::test_db().await;
    db.set_credentials(&seeded_record()).await.unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let token_base = common::spawn_stub(token_stub(
        hits,
        json!({ "access_token": "at_new", "expires_in": 3600 }),
    ))
    .await;
    // No /userinfo route at all; the fetch fails.
    let userinfo_base = common::spawn_stub(Router::new()).await;

    let oauth = service_with_stubs(db.clone(), &token_base, &userinfo_base);
    let record = oauth.exchange_code("code-abc").await.unwrap();

    assert_eq!(record.email.as_deref(), Some("Unknown"));
    assert_eq!(record.access_token.as_deref(), Some("at_new"));
}

#[tokio::test]
async fn test_exchange_grant_error_leaves_record_unchanged() {
    require_emulator!();
    let _guard = CREDENTIALS_LOCK.lock().await;

    let db = common::test_db().await;
    let seeded = seeded_record();
    db.set_credentials(&seeded).await.unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let token_base = common::spawn_stub(token_stub(
        hits,
        json!({ "error": "invalid_grant", "error_description": "Bad code" }),
    ))
    .await;
    let userinfo_base = common::spawn_stub(Router::new()).await;

    let oauth = service_with_stubs(db.clone(), &token_base, &userinfo_base);
    let err = oauth.exchange_code("code-abc").await.unwrap_err();

    assert!(err.to_string().contains("invalid_grant"));
    let stored = db.get_credentials().await.unwrap().unwrap();
    assert_eq!(stored, seeded);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduled refresh
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_updates_only_token_fields() {
    require_emulator!();
    let _guard = CREDENTIALS_LOCK.lock().await;

    let db = common::test_db().await;
    db.set_credentials(&seeded_record()).await.unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let token_base = common::spawn_stub(token_stub(
        hits.clone(),
        json!({ "access_token": "at_refreshed", "expires_in": 3600 }),
    ))
    .await;
    let userinfo_base = common::spawn_stub(Router::new()).await;

    let oauth = service_with_stubs(db.clone(), &token_base, &userinfo_base);
    let before = chrono::Utc::now().timestamp();
    oauth.refresh_if_expired().await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    let stored = db.get_credentials().await.unwrap().unwrap();
    assert_eq!(stored.access_token.as_deref(), Some("at_refreshed"));
    assert!(stored.expires_at.unwrap() >= before + 3600);

    // Everything else survives the refresh untouched.
    assert_eq!(stored.refresh_token.as_deref(), Some("rt_old"));
    assert_eq!(stored.email.as_deref(), Some("old@example.com"));
    assert_eq!(stored.property_id.as_deref(), Some("555"));
}

#[tokio::test]
async fn test_refresh_skipped_while_token_valid() {
    require_emulator!();
    let _guard = CREDENTIALS_LOCK.lock().await;

    let db = common::test_db().await;
    let mut record = seeded_record();
    record.expires_at = Some(chrono::Utc::now().timestamp() + 3600);
    db.set_credentials(&record).await.unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let token_base = common::spawn_stub(token_stub(
        hits.clone(),
        json!({ "access_token": "at_refreshed", "expires_in": 3600 }),
    ))
    .await;
    let userinfo_base = common::spawn_stub(Router::new()).await;

    let oauth = service_with_stubs(db.clone(), &token_base, &userinfo_base);
    oauth.refresh_if_expired().await;

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    let stored = db.get_credentials().await.unwrap().unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_refresh_skipped_without_refresh_token() {
    require_emulator!();
    let _guard = CREDENTIALS_LOCK.lock().await;

    let db = common::test_db().await;
    let mut record = seeded_record();
    record.refresh_token = None;
    db.set_credentials(&record).await.unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let token_base = common::spawn_stub(token_stub(
        hits.clone(),
        json!({ "access_token": "at_refreshed", "expires_in": 3600 }),
    ))
    .await;
    let userinfo_base = common::spawn_stub(Router::new()).await;

    let oauth = service_with_stubs(db.clone(), &token_base, &userinfo_base);
    oauth.refresh_if_expired().await;

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    let stored = db.get_credentials().await.unwrap().unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_refresh_failure_leaves_record_unchanged() {
    require_emulator!();
    let _guard = CREDENTIALS_LOCK.lock().await;

    let db = common::test_db().await;
    let seeded = seeded_record();
    db.set_credentials(&seeded).await.unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let token_base = common::spawn_stub(token_stub(
        hits.clone(),
        json!({ "error": "invalid_grant", "error_description": "Token revoked" }),
    ))
    .await;
    let userinfo_base = common::spawn_stub(Router::new()).await;

    let oauth = service_with_stubs(db.clone(), &token_base, &userinfo_base);
    oauth.refresh_if_expired().await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    let stored = db.get_credentials().await.unwrap().unwrap();
    assert_eq!(stored, seeded);
}

// ─────────────────────────────────────────────────────────────────────────────
// Disconnect
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_disconnect_clears_connection_fields_only() {
    require_emulator!();
    let _guard = CREDENTIALS_LOCK.lock().await;

    let db = common::test_db().await;
    db.set_credentials(&seeded_record()).await.unwrap();

    let oauth = OAuthService::new(db.clone(), REDIRECT_URI.to_string());
    oauth.disconnect().await.unwrap();

    let stored = db.get_credentials().await.unwrap().unwrap();
    assert_eq!(stored.access_token, None);
    assert_eq!(stored.refresh_token, None);
    assert_eq!(stored.expires_at, None);
    assert_eq!(stored.email, None);

    // Client credentials and the property selection stay.
    assert_eq!(stored.client_id.as_deref(), Some("client-123"));
    assert_eq!(stored.client_secret.as_deref(), Some("secret-456"));
    assert_eq!(stored.property_id.as_deref(), Some("555"));
}
