// SPDX-License-Identifier: MIT

//! GA4 API clients and the read facade over them.
//!
//! Two low-level clients (Admin API for the account/property/stream tree,
//! Data API for page-view reports) plus [`AnalyticsService`], which owns the
//! stored access token and turns every failure into an "unavailable"
//! result. Absence of data is a normal, displayable state here; callers
//! never see an error from the facade.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{AccountEntry, AccountTree, PageStat, PropertyEntry};
use serde::Deserialize;
use std::collections::BTreeMap;

const ADMIN_BASE_URL: &str = "https://analyticsadmin.googleapis.com/v1beta";
const DATA_BASE_URL: &str = "https://analyticsdata.googleapis.com/v1beta";

/// Bare ID from a GA resource name, e.g. "accounts/123" -> "123" and
/// "properties/1/dataStreams/9" -> "9".
fn resource_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types (Admin + Data API)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AccountList {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct PropertyList {
    #[serde(default)]
    properties: Vec<Property>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    pub display_name: String,
    /// Owning account resource name ("accounts/{id}"); present on direct
    /// property fetches.
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataStreamList {
    #[serde(default)]
    data_streams: Vec<DataStream>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStream {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    #[serde(default)]
    rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    #[serde(default)]
    dimension_values: Vec<ReportValue>,
    #[serde(default)]
    metric_values: Vec<ReportValue>,
}

#[derive(Debug, Deserialize)]
struct ReportValue {
    #[serde(default)]
    value: String,
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin API client
// ─────────────────────────────────────────────────────────────────────────────

/// GA4 Admin API client (accounts, properties, data streams).
#[derive(Clone)]
pub struct AnalyticsAdminClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for AnalyticsAdminClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsAdminClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: ADMIN_BASE_URL.to_string(),
        }
    }

    /// Client pointed at an alternative base URL (stub servers in tests).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn list_accounts(&self, access_token: &str) -> Result<Vec<Account>, AppError> {
        let url = format!("{}/accounts", self.base_url);
        let list: AccountList = self.get_json(&url, access_token).await?;
        Ok(list.accounts)
    }

    pub async fn list_properties(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<Vec<Property>, AppError> {
        let url = format!(
            "{}/properties?filter=parent:accounts/{}",
            self.base_url, account_id
        );
        let list: PropertyList = self.get_json(&url, access_token).await?;
        Ok(list.properties)
    }

    pub async fn get_property(
        &self,
        access_token: &str,
        property_id: &str,
    ) -> Result<Property, AppError> {
        let url = format!("{}/properties/{}", self.base_url, property_id);
        self.get_json(&url, access_token).await
    }

    pub async fn list_data_streams(
        &self,
        access_token: &str,
        property_id: &str,
    ) -> Result<Vec<DataStream>, AppError> {
        let url = format!("{}/properties/{}/dataStreams", self.base_url, property_id);
        let list: DataStreamList = self.get_json(&url, access_token).await?;
        Ok(list.data_streams)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        check_response_json(response).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Data API client
// ─────────────────────────────────────────────────────────────────────────────

/// GA4 Data API client (runReport).
#[derive(Clone)]
pub struct AnalyticsDataClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for AnalyticsDataClient {
    fn default() -> Self {
        Self::new()
    }
}

/// runReport request body: page path by page views over the trailing 30
/// days, sorted by views.
pub fn report_request_body(limit: u32, desc: bool) -> serde_json::Value {
    serde_json::json!({
        "dateRanges": [{ "startDate": "30daysAgo", "endDate": "today" }],
        "dimensions": [{ "name": "pagePath" }],
        "metrics": [{ "name": "screenPageViews" }],
        "orderBys": [{ "metric": { "metricName": "screenPageViews" }, "desc": desc }],
        "limit": limit,
    })
}

impl AnalyticsDataClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DATA_BASE_URL.to_string(),
        }
    }

    /// Client pointed at an alternative base URL (stub servers in tests).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Run the page-view report. `desc` picks top (true) or worst (false)
    /// ordering; the upstream does the sorting and capping.
    ///
    /// Zero report rows is an empty vec, not an error.
    pub async fn run_report(
        &self,
        access_token: &str,
        property_id: &str,
        limit: u32,
        desc: bool,
    ) -> Result<Vec<PageStat>, AppError> {
        let url = format!("{}/properties/{}:runReport", self.base_url, property_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&report_request_body(limit, desc))
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let report: ReportResponse = check_response_json(response).await?;

        Ok(report
            .rows
            .into_iter()
            .map(|row| PageStat {
                path: row
                    .dimension_values
                    .into_iter()
                    .next()
                    .map(|v| v.value)
                    .unwrap_or_default(),
                pageviews: row
                    .metric_values
                    .into_iter()
                    .next()
                    .map(|v| v.value)
                    .unwrap_or_default(),
            })
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AnalyticsService - read facade over an unreliable upstream
// ─────────────────────────────────────────────────────────────────────────────

/// High-level analytics reads backed by the stored credential record.
///
/// Every method returns `None` when no usable access token is stored or the
/// upstream fails (logged), and `Some` otherwise. An empty report is
/// `Some(vec![])`, distinct from unavailable.
#[derive(Clone)]
pub struct AnalyticsService {
    admin: AnalyticsAdminClient,
    data: AnalyticsDataClient,
    db: FirestoreDb,
}

impl AnalyticsService {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            admin: AnalyticsAdminClient::new(),
            data: AnalyticsDataClient::new(),
            db,
        }
    }

    /// Service backed by custom clients (stub servers in tests).
    pub fn with_clients(
        admin: AnalyticsAdminClient,
        data: AnalyticsDataClient,
        db: FirestoreDb,
    ) -> Self {
        Self { admin, data, db }
    }

    /// Stored access token plus the selected property, if connected.
    async fn connection(&self) -> Option<(String, Option<String>)> {
        let record = match self.db.get_credentials().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("No credential record stored");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load credentials");
                return None;
            }
        };

        if !record.is_connected() {
            tracing::debug!("No access token stored, analytics unavailable");
            return None;
        }

        let property_id = record.property_id.filter(|p| !p.is_empty());
        Some((record.access_token.unwrap_or_default(), property_id))
    }

    /// Account → property → data-stream tree for the property selector.
    pub async fn account_tree(&self) -> Option<AccountTree> {
        let (token, property_id) = self.connection().await?;

        fetch_account_tree(&self.admin, &token, property_id.as_deref()).await
    }

    /// Most-viewed pages over the trailing 30 days.
    pub async fn top_pages(&self, property_id: &str, limit: u32) -> Option<Vec<PageStat>> {
        self.report(property_id, limit, true).await
    }

    /// Least-viewed pages over the trailing 30 days.
    pub async fn worst_pages(&self, property_id: &str, limit: u32) -> Option<Vec<PageStat>> {
        self.report(property_id, limit, false).await
    }

    async fn report(&self, property_id: &str, limit: u32, desc: bool) -> Option<Vec<PageStat>> {
        let (token, _) = self.connection().await?;

        match self.data.run_report(&token, property_id, limit, desc).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                tracing::error!(property_id = %property_id, error = %e, "Failed to fetch page report");
                None
            }
        }
    }
}

/// Account → property → data-stream tree for the given token.
///
/// When `selected_property` is set, only that property and its streams are
/// fetched (single-entry tree), with the full walk as the fallback. Partial
/// failures drop the affected branch only; `None` means nothing usable came
/// back at all.
pub async fn fetch_account_tree(
    admin: &AnalyticsAdminClient,
    token: &str,
    selected_property: Option<&str>,
) -> Option<AccountTree> {
    if let Some(property_id) = selected_property {
        match selected_property_tree(admin, token, property_id).await {
            Ok(tree) => return Some(tree),
            Err(e) => {
                tracing::warn!(
                    property_id = %property_id,
                    error = %e,
                    "Selected-property shortcut failed, walking all accounts"
                );
            }
        }
    }

    full_account_tree(admin, token).await
}

/// Single-entry tree for the already-selected property.
async fn selected_property_tree(
    admin: &AnalyticsAdminClient,
    token: &str,
    property_id: &str,
) -> Result<AccountTree, AppError> {
    let property = admin.get_property(token, property_id).await?;
    let streams = admin.list_data_streams(token, property_id).await?;

    let mut views = BTreeMap::new();
    for stream in streams {
        views.insert(resource_id(&stream.name).to_string(), stream.display_name);
    }

    let account_id = property
        .parent
        .as_deref()
        .map(resource_id)
        .unwrap_or("unknown")
        .to_string();

    let mut properties = BTreeMap::new();
    properties.insert(
        resource_id(&property.name).to_string(),
        PropertyEntry {
            name: property.display_name,
            views,
        },
    );

    let mut tree = BTreeMap::new();
    tree.insert(
        account_id.clone(),
        AccountEntry {
            // Display name is unknown on this path; the resource name is
            // still usable as a label.
            name: format!("accounts/{}", account_id),
            properties,
        },
    );

    Ok(AccountTree(tree))
}

/// Three-level walk: accounts, their properties, their data streams.
async fn full_account_tree(admin: &AnalyticsAdminClient, token: &str) -> Option<AccountTree> {
    let accounts = match admin.list_accounts(token).await {
        Ok(accounts) => accounts,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch GA4 accounts");
            return None;
        }
    };

    if accounts.is_empty() {
        tracing::info!("No GA4 accounts visible to the connected user");
        return None;
    }

    let mut tree = BTreeMap::new();

    for account in accounts {
        let account_id = resource_id(&account.name).to_string();
        let mut entry = AccountEntry {
            name: account.display_name,
            properties: BTreeMap::new(),
        };

        let properties = match admin.list_properties(token, &account_id).await {
            Ok(properties) => properties,
            Err(e) => {
                // A failing account must not abort its siblings.
                tracing::warn!(account_id = %account_id, error = %e, "Failed to fetch properties");
                tree.insert(account_id, entry);
                continue;
            }
        };

        for property in properties {
            let property_id = resource_id(&property.name).to_string();
            let mut views = BTreeMap::new();

            match admin.list_data_streams(token, &property_id).await {
                Ok(streams) => {
                    for stream in streams {
                        views.insert(resource_id(&stream.name).to_string(), stream.display_name);
                    }
                }
                Err(e) => {
                    // Keep the property, just without streams.
                    tracing::warn!(property_id = %property_id, error = %e, "Failed to fetch data streams");
                }
            }

            entry.properties.insert(
                property_id,
                PropertyEntry {
                    name: property.display_name,
                    views,
                },
            );
        }

        tree.insert(account_id, entry);
    }

    Some(AccountTree(tree))
}
