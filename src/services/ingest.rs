// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sighting ingestion service.
//!
//! Handles the core workflow:
//! 1. Query the vision model for species and description (with retry)
//! 2. Extract the species label
//! 3. Assign a fresh sighting ID
//! 4. Upload the image to blob storage
//! 5. Persist the sighting document
//! 6. Credit the user (xp increment + sighting reference append)
//!
//! Inference is all-or-nothing: nothing is written unless both prompts
//! succeed. Each later step only runs after the previous one completed, so
//! a user reference never points at a missing sighting. The reverse gap (a
//! sighting with no back-reference) is possible when step 6 is skipped and
//! is reported to the caller as a warning.

use crate::db::{SightingStore, UserUpdate};
use crate::error::AppError;
use crate::models::{Coordinates, RasterImage, Sighting};
use crate::services::retry::{retry_with_backoff, RetryPolicy};
use crate::services::storage::{sighting_object_key, BlobStore};
use crate::services::vision::{
    extract_species_label, EncodedImage, VisionModel, DESCRIPTION_PROMPT, SPECIES_PROMPT,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Experience points awarded per accepted sighting.
pub const XP_PER_SIGHTING: i64 = 100;

/// Deadline for each store call unless configured otherwise.
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Which of the two inference prompts an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Species,
    Description,
}

impl PromptKind {
    fn prompt(self) -> &'static str {
        match self {
            PromptKind::Species => SPECIES_PROMPT,
            PromptKind::Description => DESCRIPTION_PROMPT,
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptKind::Species => f.write_str("species"),
            PromptKind::Description => f.write_str("description"),
        }
    }
}

/// Pipeline failures. Collaborator errors are flattened to text here.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("User lookup failed: {0}")]
    UserLookupFailure(String),

    #[error("Inference failed for {prompt} prompt after {attempts} attempt(s): {last_error}")]
    InferenceFailure {
        prompt: PromptKind,
        attempts: u32,
        last_error: String,
    },

    #[error("Image upload failed: {0}")]
    UploadFailure(String),

    #[error("Sighting persistence failed: {0}")]
    PersistenceFailure(String),
}

/// A sighting submitted by an authenticated user.
#[derive(Debug, Clone)]
pub struct SightingSubmission {
    pub user_id: String,
    pub image: RasterImage,
    pub coordinates: Coordinates,
    /// Capture time reported by the client; defaults to now
    pub captured_at: Option<DateTime<Utc>>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
}

/// The sighting was saved but the user could not be credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserUpdateWarning {
    /// The user lookup matched zero or several documents
    Skipped { matches: usize },
    /// The store rejected the update
    Failed(String),
}

impl fmt::Display for UserUpdateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserUpdateWarning::Skipped { matches } => write!(
                f,
                "Sighting saved, but user progress was not updated ({} matching user records)",
                matches
            ),
            UserUpdateWarning::Failed(reason) => write!(
                f,
                "Sighting saved, but user progress was not updated: {}",
                reason
            ),
        }
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub species: String,
    pub description: String,
    pub sighting: Sighting,
    /// Set when step 6 did not credit the user
    pub warning: Option<UserUpdateWarning>,
}

impl IngestOutcome {
    pub fn sighting_id(&self) -> &str {
        &self.sighting.sighting_id
    }
}

/// Runs the ingestion pipeline against injected collaborators.
#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn SightingStore>,
    blobs: Arc<dyn BlobStore>,
    vision: Arc<dyn VisionModel>,
    retry: RetryPolicy,
    store_timeout: Duration,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn SightingStore>,
        blobs: Arc<dyn BlobStore>,
        vision: Arc<dyn VisionModel>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            blobs,
            vision,
            retry,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound every store read and write in the pipeline by `timeout`.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Identify, store and credit a new sighting.
    pub async fn ingest(&self, submission: SightingSubmission) -> Result<IngestOutcome, IngestError> {
        let SightingSubmission {
            user_id,
            image,
            coordinates,
            captured_at,
            altitude,
            accuracy,
        } = submission;

        tracing::info!(
            user_id = %user_id,
            bytes = image.len(),
            format = image.mime_type(),
            "Ingesting sighting"
        );

        // 0. The submitting user must exist before anything external happens
        if self
            .bounded("user lookup", self.store.get_user(&user_id))
            .await
            .map_err(IngestError::UserLookupFailure)?
            .is_none()
        {
            return Err(IngestError::UnknownUser(user_id));
        }

        // 1. Inference: both prompts must succeed, they run concurrently
        let encoded = self.encode(&image).await?;
        let (species_answer, description) = tokio::try_join!(
            self.ask(&encoded, PromptKind::Species),
            self.ask(&encoded, PromptKind::Description),
        )?;

        // 2. Label extraction
        let species = extract_species_label(&species_answer).to_string();

        // 3. Fresh ID, whatever the client sent
        let sighting_id = uuid::Uuid::new_v4().to_string();

        // 4. Blob upload must finish before the record references the URL
        let key = sighting_object_key(&user_id, &sighting_id, image.extension());
        let sighting_url = self
            .blobs
            .upload(&key, &image)
            .await
            .map_err(|e| IngestError::UploadFailure(e.to_string()))?;

        // 5. Persist once; a retry could duplicate the record
        let now = Utc::now();
        let sighting = Sighting {
            sighting_id: sighting_id.clone(),
            user_id: user_id.clone(),
            timestamp: captured_at.unwrap_or(now),
            created_at: now,
            updated_at: now,
            coordinates,
            altitude,
            accuracy,
            species: species.clone(),
            description: description.clone(),
            sighting_url,
            comments: Vec::new(),
        };

        self.bounded("sighting insert", self.store.insert_sighting(&sighting))
            .await
            .map_err(IngestError::PersistenceFailure)?;

        tracing::info!(
            user_id = %user_id,
            sighting_id = %sighting_id,
            species = %species,
            "Sighting persisted"
        );

        // 6. Credit the user; the sighting stays even if this is skipped
        let warning = match self
            .bounded(
                "user update",
                self.store
                    .award_sighting(&user_id, &sighting_id, XP_PER_SIGHTING),
            )
            .await
        {
            Ok(UserUpdate::Applied) => None,
            Ok(UserUpdate::Skipped { matches }) => {
                tracing::warn!(
                    user_id = %user_id,
                    sighting_id = %sighting_id,
                    matches,
                    "User update skipped: sighting has no back-reference"
                );
                Some(UserUpdateWarning::Skipped { matches })
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    sighting_id = %sighting_id,
                    error = %e,
                    "User update failed: sighting has no back-reference"
                );
                Some(UserUpdateWarning::Failed(e))
            }
        };

        Ok(IngestOutcome {
            species,
            description,
            sighting,
            warning,
        })
    }

    /// Inference-only path: the raw species answer for a preview, nothing stored.
    pub async fn describe(&self, image: &RasterImage) -> Result<String, IngestError> {
        let encoded = self.encode(image).await?;
        self.ask(&encoded, PromptKind::Species).await
    }

    /// Encoding shares the inference retry budget. Its failures are
    /// reported against the species prompt, the first one to need it.
    async fn encode(&self, image: &RasterImage) -> Result<EncodedImage, IngestError> {
        retry_with_backoff("image encoding", self.retry, || self.vision.encode(image))
            .await
            .map_err(|e| IngestError::InferenceFailure {
                prompt: PromptKind::Species,
                attempts: e.attempts,
                last_error: format!("image encoding failed: {}", e.last_error),
            })
    }

    /// Run one store call under the store deadline, flattening errors to text.
    async fn bounded<T>(
        &self,
        step: &str,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, String> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => {
                tracing::warn!(step, timeout = ?self.store_timeout, "Store call timed out");
                Err(format!("{} timed out after {:?}", step, self.store_timeout))
            }
        }
    }

    async fn ask(&self, image: &EncodedImage, kind: PromptKind) -> Result<String, IngestError> {
        let operation = format!("{} inference", kind);
        retry_with_backoff(&operation, self.retry, || self.vision.query(image, kind.prompt()))
            .await
            .map_err(|e| IngestError::InferenceFailure {
                prompt: kind,
                attempts: e.attempts,
                last_error: e.last_error,
            })
    }
}
