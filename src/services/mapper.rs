// SPDX-License-Identifier: MIT

//! Mapping GA page paths onto posts by slug.
//!
//! The slug heuristic is deliberately lossy: any GA path whose final
//! segment is not the post's slug (pagination, query-string paths, archive
//! pages) silently fails to match. That is accepted behavior.

use crate::db::FirestoreDb;
use crate::models::{PageStat, Post};
use serde::Serialize;

/// Derive a slug from a GA page path: trim surrounding slashes and take the
/// last non-empty segment. `None` for the root path.
pub fn slug_from_path(path: &str) -> Option<&str> {
    path.trim_matches('/').rsplit('/').find(|s| !s.is_empty())
}

/// One successfully applied view count.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedPost {
    pub post_id: u64,
    pub slug: String,
    pub views: i64,
}

/// Per-item result of a view-count batch. The batch is not transactional:
/// one bad path never aborts the rest.
#[derive(Debug, Default, Serialize)]
pub struct MappingOutcome {
    pub updated: Vec<UpdatedPost>,
    /// Paths whose derived slug matched no post
    pub unmatched: Vec<String>,
    /// Store failures (logged individually)
    pub errors: u32,
}

/// A report row paired with its matched post, for display only.
#[derive(Debug, Clone, Serialize)]
pub struct MappedPage {
    pub path: String,
    pub pageviews: String,
    /// `None` when no post matched the derived slug
    pub post: Option<MappedPost>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappedPost {
    pub id: u64,
    pub title: String,
    pub permalink: String,
}

/// Maps GA report rows onto stored posts.
#[derive(Clone)]
pub struct PostMapper {
    db: FirestoreDb,
}

impl PostMapper {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Persist view counts onto matching posts. Overwrites each matched
    /// post's metadata with the latest report value and reports per-item
    /// success and no-match events for the caller to log.
    pub async fn apply_view_counts(&self, stats: &[PageStat], post_type: &str) -> MappingOutcome {
        let mut outcome = MappingOutcome::default();

        for stat in stats {
            let Some(slug) = slug_from_path(&stat.path) else {
                tracing::info!(path = %stat.path, "No slug derivable from path");
                outcome.unmatched.push(stat.path.clone());
                continue;
            };

            let post = match self.db.get_post_by_slug(slug, post_type).await {
                Ok(post) => post,
                Err(e) => {
                    tracing::error!(slug = %slug, error = %e, "Post lookup failed");
                    outcome.errors += 1;
                    continue;
                }
            };

            let Some(post) = post else {
                tracing::info!(slug = %slug, path = %stat.path, "No matching post for slug");
                outcome.unmatched.push(stat.path.clone());
                continue;
            };

            let views = stat.pageviews_count();
            match self.db.set_post_views(post.id, views).await {
                Ok(()) => {
                    tracing::info!(post_id = post.id, views, "Updated post view count");
                    outcome.updated.push(UpdatedPost {
                        post_id: post.id,
                        slug: slug.to_string(),
                        views,
                    });
                }
                Err(e) => {
                    tracing::error!(post_id = post.id, error = %e, "Failed to write view count");
                    outcome.errors += 1;
                }
            }
        }

        outcome
    }

    /// Pair report rows with their matched posts without persisting
    /// anything (the worst-performing table).
    pub async fn map_pages(&self, stats: &[PageStat], post_type: &str) -> Vec<MappedPage> {
        let mut pages = Vec::with_capacity(stats.len());

        for stat in stats {
            let post = match slug_from_path(&stat.path) {
                Some(slug) => match self.db.get_post_by_slug(slug, post_type).await {
                    Ok(post) => post.map(|p: Post| MappedPost {
                        id: p.id,
                        title: p.title,
                        permalink: p.permalink,
                    }),
                    Err(e) => {
                        tracing::error!(slug = %slug, error = %e, "Post lookup failed");
                        None
                    }
                },
                None => None,
            };

            pages.push(MappedPage {
                path: stat.path.clone(),
                pageviews: stat.pageviews.clone(),
                post,
            });
        }

        pages
    }
}
