// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Comment, Coordinates, Sighting};
use crate::services::{load_biodex, nearby_sightings, Biodex};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/biodex", get(get_biodex))
        .route("/api/sightings", get(list_sightings))
        .route("/api/sightings/nearby", get(get_nearby))
        .route("/api/sightings/{sighting_id}", get(get_sighting))
        .route("/api/sightings/{sighting_id}/comments", post(add_comment))
}

// ─── User Profile ────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AchievementResponse {
    pub name: String,
    pub date_acquired: String,
}

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub firstname: String,
    pub lastname: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp: i64,
    pub sightings_count: u32,
    pub achievements: Vec<AchievementResponse>,
    pub stickers: Vec<String>,
    pub colorblind: bool,
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .store
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(UserResponse {
        user_id: profile.user_id,
        email: profile.email,
        firstname: profile.firstname,
        lastname: profile.lastname,
        xp: profile.xp,
        sightings_count: profile.sightings.len() as u32,
        achievements: profile
            .achievements
            .into_iter()
            .map(|a| AchievementResponse {
                name: a.achievement_name,
                date_acquired: format_utc_rfc3339(a.date_acquired),
            })
            .collect(),
        stickers: profile.stickers,
        colorblind: profile.colorblind,
    }))
}

// ─── Leaderboard ─────────────────────────────────────────────

fn default_leaderboard_limit() -> u32 {
    10
}

#[derive(Deserialize, Validate)]
struct LeaderboardQuery {
    #[serde(default = "default_leaderboard_limit")]
    #[validate(range(min = 1, max = 100))]
    limit: u32,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub firstname: String,
    pub lastname: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp: i64,
    pub achievement_count: u32,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardResponse {
    pub users: Vec<LeaderboardEntry>,
}

/// Top users by xp. Ranks are positional; equal xp does not share a rank.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>> {
    params.validate()?;

    let users = state.store.top_users(params.limit).await?;

    Ok(Json(LeaderboardResponse {
        users: users
            .into_iter()
            .enumerate()
            .map(|(i, u)| LeaderboardEntry {
                rank: i as u32 + 1,
                user_id: u.user_id,
                firstname: u.firstname,
                lastname: u.lastname,
                xp: u.xp,
                achievement_count: u.achievements.len() as u32,
            })
            .collect(),
    }))
}

// ─── Biodex ──────────────────────────────────────────────────

async fn get_biodex(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Biodex>> {
    let biodex = load_biodex(state.store.as_ref(), &user.user_id).await?;
    Ok(Json(biodex))
}

// ─── Sightings ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommentResponse {
    pub user_id: String,
    pub comment: String,
    pub timestamp: String,
}

/// Sighting as returned by the API.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SightingResponse {
    pub sighting_id: String,
    pub user_id: String,
    pub species: String,
    pub description: String,
    pub sighting_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub timestamp: String,
    pub created_at: String,
    pub comments: Vec<CommentResponse>,
}

impl From<Sighting> for SightingResponse {
    fn from(s: Sighting) -> Self {
        Self {
            sighting_id: s.sighting_id,
            user_id: s.user_id,
            species: s.species,
            description: s.description,
            sighting_url: s.sighting_url,
            latitude: s.coordinates.lat,
            longitude: s.coordinates.lng,
            altitude: s.altitude,
            accuracy: s.accuracy,
            timestamp: format_utc_rfc3339(s.timestamp),
            created_at: format_utc_rfc3339(s.created_at),
            comments: s
                .comments
                .into_iter()
                .map(|c| CommentResponse {
                    user_id: c.user_id,
                    comment: c.comment,
                    timestamp: format_utc_rfc3339(c.timestamp),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SightingsResponse {
    pub sightings: Vec<SightingResponse>,
}

/// The caller's sightings, newest first.
async fn list_sightings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SightingsResponse>> {
    let sightings = state.store.sightings_for_user(&user.user_id).await?;
    tracing::debug!(user_id = %user.user_id, count = sightings.len(), "Listing sightings");

    Ok(Json(SightingsResponse {
        sightings: sightings.into_iter().map(SightingResponse::from).collect(),
    }))
}

async fn get_sighting(
    State(state): State<Arc<AppState>>,
    Path(sighting_id): Path<String>,
) -> Result<Json<SightingResponse>> {
    let sighting = state
        .store
        .get_sighting(&sighting_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Sighting {} not found", sighting_id)))?;

    Ok(Json(sighting.into()))
}

// ─── Nearby ──────────────────────────────────────────────────

fn default_radius() -> f64 {
    1000.0
}

#[derive(Deserialize, Validate)]
struct NearbyQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    lng: f64,
    /// Search radius in meters
    #[serde(default = "default_radius")]
    #[validate(range(min = 1.0, max = 50000.0))]
    radius: f64,
}

/// Recent sightings around a point, as GeoJSON.
async fn get_nearby(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyQuery>,
) -> Result<Json<FeatureCollection>> {
    params.validate()?;

    let center = Coordinates::new(params.lat, params.lng);
    let collection = nearby_sightings(state.store.as_ref(), center, params.radius).await?;
    Ok(Json(collection))
}

// ─── Comments ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct CommentRequest {
    #[validate(length(min = 1, max = 1000))]
    comment: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommentAddedResponse {
    /// False when no sighting has this ID
    pub added: bool,
}

/// Append a comment to a sighting. Unknown sightings are a no-op.
async fn add_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(sighting_id): Path<String>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<CommentAddedResponse>> {
    body.validate()?;

    let comment = Comment::new(&user.user_id, &body.comment);
    let updated = state.store.append_comment(&sighting_id, &comment).await?;

    match updated {
        0 => tracing::warn!(
            sighting_id = %sighting_id,
            user_id = %user.user_id,
            "Comment on unknown sighting ignored"
        ),
        1 => tracing::info!(sighting_id = %sighting_id, user_id = %user.user_id, "Comment added"),
        n => tracing::warn!(
            sighting_id = %sighting_id,
            documents = n,
            "Comment appended to multiple sightings with the same ID"
        ),
    }

    Ok(Json(CommentAddedResponse { added: updated > 0 }))
}
