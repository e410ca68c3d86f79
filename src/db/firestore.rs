// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, xp, sighting references)
//! - Sightings (`sightings_map` documents and their comments)
//!
//! Both collections use store-generated document IDs, so every lookup is a
//! field-equality query on the logical ID (`userID`, `sightingID`).

use crate::db::{collections, SightingStore, UserUpdate};
use crate::error::AppError;
use crate::models::{Comment, Sighting, User};
use async_trait::async_trait;
use firestore::FirestoreQueryDirection;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
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

        Ok(Self { client })
    }

    /// Resolve the document IDs of every document in `collection` whose
    /// `field` equals `value`.
    async fn find_document_ids(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<String>, AppError> {
        let documents = self
            .client
            .fluent()
            .select()
            .from(collection)
            .filter(|q| q.field(field).eq(value))
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Document names are full resource paths; the ID is the last segment.
        Ok(documents
            .iter()
            .filter_map(|doc| doc.name.rsplit('/').next())
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl SightingStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let _: User = self
            .client
            .fluent()
            .insert()
            .into(collections::USERS)
            .generate_document_id()
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(user_id = %user.user_id, "User created");
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let mut users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.field("userID").eq(user_id))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    async fn top_users(&self, limit: u32) -> Result<Vec<User>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("xp", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Credits the user through field transforms (server-side increment and
    /// array union), so concurrent ingestions for one user never lose an
    /// update.
    async fn award_sighting(
        &self,
        user_id: &str,
        sighting_id: &str,
        xp: i64,
    ) -> Result<UserUpdate, AppError> {
        let doc_ids = self
            .find_document_ids(collections::USERS, "userID", user_id)
            .await?;

        let [doc_id] = doc_ids.as_slice() else {
            return Ok(UserUpdate::Skipped {
                matches: doc_ids.len(),
            });
        };

        let client = &self.client;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(doc_id)
            .transforms(|t| {
                t.fields([
                    t.field("xp").increment(xp),
                    t.field("sightings")
                        .append_missing_elements([sighting_id.to_string()]),
                ])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user update to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("User update commit failed: {}", e)))?;

        Ok(UserUpdate::Applied)
    }

    // ─── Sighting Operations ─────────────────────────────────────

    async fn insert_sighting(&self, sighting: &Sighting) -> Result<(), AppError> {
        let _: Sighting = self
            .client
            .fluent()
            .insert()
            .into(collections::SIGHTINGS)
            .generate_document_id()
            .object(sighting)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_sighting(&self, sighting_id: &str) -> Result<Option<Sighting>, AppError> {
        let mut sightings: Vec<Sighting> = self
            .client
            .fluent()
            .select()
            .from(collections::SIGHTINGS)
            .filter(|q| q.field("sightingID").eq(sighting_id))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(sightings.pop())
    }

    async fn sightings_for_user(&self, user_id: &str) -> Result<Vec<Sighting>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::SIGHTINGS)
            .filter(|q| q.field("userID").eq(user_id))
            // Sort by creation time descending
            .order_by([("createdAt", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn recent_sightings(&self, limit: u32) -> Result<Vec<Sighting>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::SIGHTINGS)
            .order_by([("createdAt", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn append_comment(
        &self,
        sighting_id: &str,
        comment: &Comment,
    ) -> Result<usize, AppError> {
        let doc_ids = self
            .find_document_ids(collections::SIGHTINGS, "sightingID", sighting_id)
            .await?;

        if doc_ids.is_empty() {
            return Ok(0);
        }

        let client = &self.client;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for doc_id in &doc_ids {
            client
                .fluent()
                .update()
                .in_col(collections::SIGHTINGS)
                .document_id(doc_id)
                .transforms(|t| {
                    t.fields([t
                        .field("comments")
                        .append_missing_elements([comment.clone()])])
                })
                .only_transform()
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add comment to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Comment commit failed: {}", e)))?;

        Ok(doc_ids.len())
    }
}
