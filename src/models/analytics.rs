// SPDX-License-Identifier: MIT

//! Normalized shapes produced by the Analytics client.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a pagePath/screenPageViews report.
///
/// The view count is kept as the upstream-formatted string for display;
/// use [`PageStat::pageviews_count`] wherever it is treated as a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStat {
    pub path: String,
    pub pageviews: String,
}

impl PageStat {
    pub fn new(path: impl Into<String>, pageviews: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            pageviews: pageviews.into(),
        }
    }

    /// Integer view count. Unparseable upstream values count as zero.
    pub fn pageviews_count(&self) -> i64 {
        self.pageviews.replace(',', "").trim().parse().unwrap_or(0)
    }
}

/// Flattened account → property → data-stream tree from the Admin API,
/// keyed by the bare resource IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTree(pub BTreeMap<String, AccountEntry>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub name: String,
    pub properties: BTreeMap<String, PropertyEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub name: String,
    /// Data stream ID → display name
    pub views: BTreeMap<String, String>,
}
