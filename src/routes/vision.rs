// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image upload routes: sighting ingestion and inference-only preview.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Coordinates, RasterImage};
use crate::routes::api::SightingResponse;
use crate::services::SightingSubmission;
use crate::time_utils::parse_capture_timestamp;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{multipart::Field, Multipart, State},
    routing::post,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Sighting upload (requires authentication).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/vision/process", post(process_sighting))
}

/// Inference-only preview (public).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/moondream/describe", post(describe_image))
}

// ─── Multipart parsing ───────────────────────────────────────

/// Fields of a sighting upload form.
#[derive(Default)]
struct SightingForm {
    file: Option<Bytes>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,
    accuracy: Option<f64>,
    timestamp: Option<DateTime<Utc>>,
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Malformed multipart body: {}", e))
}

async fn read_text(field: Field<'_>) -> Result<String> {
    field.text().await.map_err(multipart_error)
}

async fn read_number(field: Field<'_>, name: &str) -> Result<f64> {
    let raw = read_text(field).await?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::BadRequest(format!("'{}' must be a number, got {:?}", name, raw)))
}

impl SightingForm {
    async fn from_multipart(multipart: &mut Multipart) -> Result<Self> {
        let mut form = SightingForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => form.file = Some(field.bytes().await.map_err(multipart_error)?),
                "latitude" => form.latitude = Some(read_number(field, "latitude").await?),
                "longitude" => form.longitude = Some(read_number(field, "longitude").await?),
                "altitude" => form.altitude = Some(read_number(field, "altitude").await?),
                "accuracy" => form.accuracy = Some(read_number(field, "accuracy").await?),
                "timestamp" => {
                    let raw = read_text(field).await?;
                    let parsed = parse_capture_timestamp(&raw).ok_or_else(|| {
                        AppError::BadRequest(format!("Invalid 'timestamp': {:?}", raw))
                    })?;
                    form.timestamp = Some(parsed);
                }
                other => {
                    tracing::debug!(field = other, "Ignoring unknown form field");
                }
            }
        }

        Ok(form)
    }

    /// Take the uploaded file and verify it decodes, off the async workers.
    async fn image(&mut self) -> Result<RasterImage> {
        let bytes = self
            .file
            .take()
            .ok_or_else(|| AppError::BadRequest("Multipart form must include a file".to_string()))?;
        let image = tokio::task::spawn_blocking(move || RasterImage::from_bytes(bytes))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;
        Ok(image)
    }
}

// ─── Sighting ingestion ──────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProcessResponse {
    pub species: String,
    pub description: String,
    pub sighting: SightingResponse,
    /// Present when the sighting was saved but the user was not credited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Identify the animal in an uploaded photo and record the sighting.
async fn process_sighting(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>> {
    let mut form = SightingForm::from_multipart(&mut multipart).await?;
    let image = form.image().await?;

    let (latitude, longitude) = match (form.latitude, form.longitude) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            return Err(AppError::BadRequest(
                "'latitude' and 'longitude' are required".to_string(),
            ))
        }
    };

    let outcome = state
        .ingest
        .ingest(SightingSubmission {
            user_id: user.user_id,
            image,
            coordinates: Coordinates::new(latitude, longitude),
            captured_at: form.timestamp,
            altitude: form.altitude,
            accuracy: form.accuracy,
        })
        .await?;

    Ok(Json(ProcessResponse {
        species: outcome.species,
        description: outcome.description,
        sighting: SightingResponse::from(outcome.sighting),
        warning: outcome.warning.map(|w| w.to_string()),
    }))
}

// ─── Preview ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DescribeResponse {
    /// Raw model answer, `Species: <name>` when the model follows the prompt
    pub description: String,
}

/// Run the species prompt on an image without storing anything.
async fn describe_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DescribeResponse>> {
    let mut form = SightingForm::from_multipart(&mut multipart).await?;
    let image = form.image().await?;

    let description = state.ingest.describe(&image).await?;

    Ok(Json(DescribeResponse { description }))
}
