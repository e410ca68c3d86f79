// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AnimaGo: wildlife sightings as a game
//!
//! This crate provides the backend API that identifies animals in uploaded
//! photos, records sightings, and credits users with experience points.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SightingStore;
use services::{BlobStore, IngestService, RetryPolicy, VisionModel};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SightingStore>,
    pub ingest: IngestService,
}

impl AppState {
    /// Wire the services together from their collaborators.
    pub fn new(
        config: Config,
        store: Arc<dyn SightingStore>,
        blobs: Arc<dyn BlobStore>,
        vision: Arc<dyn VisionModel>,
    ) -> Self {
        let retry = RetryPolicy::fixed(
            config.inference_max_attempts,
            config.inference_retry_delay,
            config.inference_timeout,
        );
        let ingest = IngestService::new(store.clone(), blobs, vision, retry)
            .with_store_timeout(config.store_timeout);

        Self {
            config,
            store,
            ingest,
        }
    }
}
