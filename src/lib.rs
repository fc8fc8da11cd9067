// SPDX-License-Identifier: MIT

//! GA4 Top Posts: sync Google Analytics 4 page views onto CMS posts.
//!
//! This crate provides the backend service that keeps GA4 OAuth credentials
//! fresh, pulls per-page view counts, and maps them onto posts by slug.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{AnalyticsService, OAuthService, PostMapper};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub oauth: OAuthService,
    pub analytics: AnalyticsService,
    pub mapper: PostMapper,
}
