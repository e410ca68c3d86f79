// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sighting model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic coordinate pair (WGS84 degrees).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A single recorded animal observation.
///
/// Stored in `sightings_map` under a store-generated document ID;
/// `sightingID` is the logical key used for lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sighting {
    #[serde(rename = "sightingID")]
    pub sighting_id: String,
    /// Owning user
    #[serde(rename = "userID")]
    pub user_id: String,
    /// When the photo was taken (client-reported)
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "createdAt", with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
    pub coordinates: Coordinates,
    /// Altitude in meters, if the device reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters, if the device reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Inferred species label (free text)
    pub species: String,
    /// Inferred description (free text)
    pub description: String,
    /// Public image URL
    #[serde(rename = "sightingURL")]
    pub sighting_url: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// A comment left on a sighting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    /// Commenter's user ID
    pub user_id: String,
    pub comment: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Comment {
    pub fn new(user_id: &str, body: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            comment: body.to_string(),
            timestamp: Utc::now(),
        }
    }
}
