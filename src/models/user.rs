//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
///
/// Documents live under a store-generated ID; `userID` is the lookup key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Opaque unique user ID
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Authentication email
    #[serde(default)]
    pub email: Option<String>,
    /// First name
    #[serde(default)]
    pub firstname: String,
    /// Last name
    #[serde(default)]
    pub lastname: String,
    /// Experience points, only ever incremented by sighting ingestion
    #[serde(default)]
    pub xp: i64,
    /// Sighting IDs in insertion order
    #[serde(default)]
    pub sightings: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    /// Cosmetic sticker image URLs
    #[serde(default)]
    pub stickers: Vec<String>,
    #[serde(default)]
    pub colorblind: bool,
}

impl User {
    /// A freshly registered user with no progress.
    pub fn new(user_id: impl Into<String>, firstname: &str, lastname: &str) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            xp: 0,
            sightings: Vec::new(),
            achievements: Vec::new(),
            stickers: Vec::new(),
            colorblind: false,
        }
    }
}

/// An unlocked achievement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Achievement {
    #[serde(rename = "achievementName")]
    pub achievement_name: String,
    #[serde(rename = "dateAcquired", with = "firestore::serialize_as_timestamp")]
    pub date_acquired: DateTime<Utc>,
}
