// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Mirrors the Firestore layout: documents keyed by generated IDs, looked up
//! by field value. User credits take the document's shard lock for the whole
//! increment/append, which gives the same no-lost-update guarantee as the
//! Firestore field transforms.

use crate::db::{SightingStore, UserUpdate};
use crate::error::AppError;
use crate::models::{Comment, Sighting, User};
use async_trait::async_trait;
use dashmap::DashMap;

/// `SightingStore` backed by concurrent hash maps.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    sightings: DashMap<String, Sighting>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sighting documents, duplicates included.
    pub fn sighting_count(&self) -> usize {
        self.sightings.len()
    }

    /// Number of user documents, duplicates included.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn user_doc_ids(&self, user_id: &str) -> Vec<String> {
        self.users
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn sighting_doc_ids(&self, sighting_id: &str) -> Vec<String> {
        self.sightings
            .iter()
            .filter(|entry| entry.value().sighting_id == sighting_id)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl SightingStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(new_document_id(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn top_users(&self, limit: u32) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| b.xp.cmp(&a.xp));
        users.truncate(limit as usize);
        Ok(users)
    }

    async fn award_sighting(
        &self,
        user_id: &str,
        sighting_id: &str,
        xp: i64,
    ) -> Result<UserUpdate, AppError> {
        let doc_ids = self.user_doc_ids(user_id);
        let [doc_id] = doc_ids.as_slice() else {
            return Ok(UserUpdate::Skipped {
                matches: doc_ids.len(),
            });
        };

        match self.users.get_mut(doc_id) {
            Some(mut user) => {
                user.xp += xp;
                // Array-union semantics: append only if absent
                if !user.sightings.iter().any(|id| id == sighting_id) {
                    user.sightings.push(sighting_id.to_string());
                }
                Ok(UserUpdate::Applied)
            }
            // Removed between lookup and update
            None => Ok(UserUpdate::Skipped { matches: 0 }),
        }
    }

    async fn insert_sighting(&self, sighting: &Sighting) -> Result<(), AppError> {
        self.sightings.insert(new_document_id(), sighting.clone());
        Ok(())
    }

    async fn get_sighting(&self, sighting_id: &str) -> Result<Option<Sighting>, AppError> {
        Ok(self
            .sightings
            .iter()
            .find(|entry| entry.value().sighting_id == sighting_id)
            .map(|entry| entry.value().clone()))
    }

    async fn sightings_for_user(&self, user_id: &str) -> Result<Vec<Sighting>, AppError> {
        let mut sightings: Vec<Sighting> = self
            .sightings
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        sightings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sightings)
    }

    async fn recent_sightings(&self, limit: u32) -> Result<Vec<Sighting>, AppError> {
        let mut sightings: Vec<Sighting> =
            self.sightings.iter().map(|e| e.value().clone()).collect();
        sightings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sightings.truncate(limit as usize);
        Ok(sightings)
    }

    async fn append_comment(
        &self,
        sighting_id: &str,
        comment: &Comment,
    ) -> Result<usize, AppError> {
        let mut updated = 0;
        for doc_id in self.sighting_doc_ids(sighting_id) {
            if let Some(mut sighting) = self.sightings.get_mut(&doc_id) {
                if !sighting.comments.contains(comment) {
                    sighting.comments.push(comment.clone());
                }
                updated += 1;
            }
        }
        Ok(updated)
    }
}
