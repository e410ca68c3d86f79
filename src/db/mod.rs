//! Database layer.
//!
//! `SightingStore` is the seam between the handlers and the document
//! database. Firestore backs it in production; `MemoryStore` backs it for
//! local development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Comment, Sighting, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SIGHTINGS: &str = "sightings_map";
}

/// Outcome of crediting a user for a persisted sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserUpdate {
    /// xp incremented and the sighting reference appended
    Applied,
    /// The user lookup did not find exactly one document; nothing changed
    Skipped { matches: usize },
}

/// Document store operations used by the API.
///
/// User mutations go through store-native atomic primitives only
/// (numeric increment, array union); implementations must never
/// read-modify-write a user document.
#[async_trait]
pub trait SightingStore: Send + Sync {
    /// Register a new user under a fresh document ID.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    /// Look up a user by `userID`.
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Top `limit` users by descending xp. Order among equal xp is unspecified.
    async fn top_users(&self, limit: u32) -> Result<Vec<User>, AppError>;

    /// Atomically add `xp` and append `sighting_id` to the user's sightings.
    async fn award_sighting(
        &self,
        user_id: &str,
        sighting_id: &str,
        xp: i64,
    ) -> Result<UserUpdate, AppError>;

    /// Insert a sighting as a new document.
    async fn insert_sighting(&self, sighting: &Sighting) -> Result<(), AppError>;

    /// Look up a sighting by `sightingID`.
    async fn get_sighting(&self, sighting_id: &str) -> Result<Option<Sighting>, AppError>;

    /// All sightings owned by a user, newest first.
    async fn sightings_for_user(&self, user_id: &str) -> Result<Vec<Sighting>, AppError>;

    /// Most recently created sightings across all users.
    async fn recent_sightings(&self, limit: u32) -> Result<Vec<Sighting>, AppError>;

    /// Atomically append a comment to every sighting whose `sightingID`
    /// matches. Returns the number of documents updated.
    async fn append_comment(&self, sighting_id: &str, comment: &Comment)
        -> Result<usize, AppError>;
}
