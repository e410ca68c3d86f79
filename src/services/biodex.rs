// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Biodex: a user's collection of discovered species.

use crate::db::SightingStore;
use crate::error::AppError;
use crate::models::Sighting;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Max concurrent sighting lookups when resolving a user's references.
const MAX_CONCURRENT_LOOKUPS: usize = 10;

/// One discovered species.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BiodexEntry {
    /// Label as first recorded by the user
    pub species: String,
    pub count: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub first_seen: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub last_seen: DateTime<Utc>,
    /// Picture from the most recent sighting
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Biodex {
    pub total_sightings: u32,
    pub distinct_species: u32,
    pub entries: Vec<BiodexEntry>,
}

/// Normalize a species label for grouping.
fn species_key(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Group sightings by species, in discovery order.
pub fn build_biodex(sightings: &[Sighting]) -> Biodex {
    let mut entries: HashMap<String, BiodexEntry> = HashMap::new();

    for sighting in sightings {
        let entry = entries
            .entry(species_key(&sighting.species))
            .or_insert_with(|| BiodexEntry {
                species: sighting.species.trim().to_string(),
                count: 0,
                first_seen: sighting.timestamp,
                last_seen: sighting.timestamp,
                image_url: sighting.sighting_url.clone(),
            });

        entry.count += 1;
        if sighting.timestamp < entry.first_seen {
            entry.first_seen = sighting.timestamp;
            entry.species = sighting.species.trim().to_string();
        }
        if sighting.timestamp >= entry.last_seen {
            entry.last_seen = sighting.timestamp;
            entry.image_url = sighting.sighting_url.clone();
        }
    }

    let mut entries: Vec<BiodexEntry> = entries.into_values().collect();
    entries.sort_by(|a, b| {
        a.first_seen
            .cmp(&b.first_seen)
            .then_with(|| a.species.cmp(&b.species))
    });

    Biodex {
        total_sightings: sightings.len() as u32,
        distinct_species: entries.len() as u32,
        entries,
    }
}

/// Resolve a user's sighting references and build their Biodex.
///
/// References to sightings that no longer exist are skipped.
pub async fn load_biodex(store: &dyn SightingStore, user_id: &str) -> Result<Biodex, AppError> {
    let user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

    let resolved = stream::iter(user.sightings)
        .map(|sighting_id: String| async move {
            let found = store.get_sighting(&sighting_id).await?;
            if found.is_none() {
                tracing::warn!(
                    user_id,
                    sighting_id = %sighting_id,
                    "Dangling sighting reference"
                );
            }
            Ok::<_, AppError>(found)
        })
        .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
        .collect::<Vec<Result<Option<Sighting>, AppError>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<Option<Sighting>>, AppError>>()?;

    let sightings: Vec<Sighting> = resolved.into_iter().flatten().collect();
    Ok(build_biodex(&sightings))
}
