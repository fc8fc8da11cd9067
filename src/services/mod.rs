// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod analytics;
pub mod mapper;
pub mod oauth;

pub use analytics::{fetch_account_tree, AnalyticsAdminClient, AnalyticsDataClient, AnalyticsService};
pub use mapper::{MappingOutcome, PostMapper};
pub use oauth::{GoogleOAuthClient, OAuthService};
