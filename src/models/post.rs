// SPDX-License-Identifier: MIT

//! Post model for storage and API.

use serde::{Deserialize, Serialize};

/// A content item mirrored from the CMS into the `posts` collection.
///
/// The view-count fields are the only ones this service writes; everything
/// else arrives through the CMS sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// CMS post ID (also used as document ID)
    pub id: u64,
    /// Post title
    pub title: String,
    /// URL slug, the lookup key for GA path mapping
    pub slug: String,
    /// Content type, e.g. "post" or "page"
    pub post_type: String,
    /// Public URL of the post
    pub permalink: String,
    /// Page views from the most recent GA report. Overwritten on every
    /// sync run, never accumulated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ga_page_views: Option<i64>,
    /// When the view count was last written (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views_updated_at: Option<String>,
}
