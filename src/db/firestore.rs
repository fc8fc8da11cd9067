// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - The credential record (single settings document)
//! - Posts (slug lookup, view-count metadata, top-posts query)

use crate::db::{collections, CREDENTIALS_DOC_ID};
use crate::error::AppError;
use crate::models::{CredentialRecord, Post};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Credential Record Operations ────────────────────────────

    /// Load the credential record, if one has been saved.
    pub async fn get_credentials(&self) -> Result<Option<CredentialRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SETTINGS)
            .obj()
            .one(CREDENTIALS_DOC_ID)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store the credential record, fully overwriting any prior document.
    pub async fn set_credentials(&self, record: &CredentialRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SETTINGS)
            .document_id(CREDENTIALS_DOC_ID)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Post Operations ─────────────────────────────────────────

    /// Get a post by its CMS ID.
    pub async fn get_post(&self, post_id: u64) -> Result<Option<Post>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::POSTS)
            .obj()
            .one(&post_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a post (CMS sync surface and tests).
    pub async fn upsert_post(&self, post: &Post) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::POSTS)
            .document_id(post.id.to_string())
            .object(post)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create or update many posts concurrently (bounded).
    pub async fn batch_upsert_posts(&self, posts: &[Post]) -> Result<(), AppError> {
        let client = self.get_client()?;

        stream::iter(posts.to_vec())
            .map(|post| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::POSTS)
                    .document_id(post.id.to_string())
                    .object(&post)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    /// Look up a post of the given type by its URL slug.
    pub async fn get_post_by_slug(
        &self,
        slug: &str,
        post_type: &str,
    ) -> Result<Option<Post>, AppError> {
        let slug = slug.to_string();
        let post_type = post_type.to_string();

        let posts: Vec<Post> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::POSTS)
            .filter(move |q| {
                q.for_all([
                    q.field("slug").eq(slug.clone()),
                    q.field("post_type").eq(post_type.clone()),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(posts.into_iter().next())
    }

    /// Overwrite a post's view-count metadata with the latest report value.
    pub async fn set_post_views(&self, post_id: u64, views: i64) -> Result<(), AppError> {
        let mut post = self
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {}", post_id)))?;

        post.ga_page_views = Some(views);
        post.views_updated_at = Some(chrono::Utc::now().to_rfc3339());

        self.upsert_post(&post).await
    }

    /// Posts of the given type ordered by persisted view count, descending.
    ///
    /// Posts with no view-count metadata are excluded (order-by on a missing
    /// field drops the document), matching the meta-keyed query this replaces.
    pub async fn top_posts_by_views(
        &self,
        post_type: &str,
        limit: u32,
    ) -> Result<Vec<Post>, AppError> {
        let post_type = post_type.to_string();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::POSTS)
            .filter(move |q| q.for_all([q.field("post_type").eq(post_type.clone())]))
            .order_by([(
                "ga_page_views",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
