// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AnimaGo API Server
//!
//! Accepts wildlife photos, identifies the species with a hosted vision
//! model, and records sightings for the game.

use animago_api::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, SightingStore},
    services::{BlobStore, GcsBlobStore, MemoryBlobStore, MoondreamClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting AnimaGo API"
    );

    // Document store and image storage
    let (store, blobs): (Arc<dyn SightingStore>, Arc<dyn BlobStore>) = match config.store_backend
    {
        StoreBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            let blobs = GcsBlobStore::new(&config.storage_bucket).await?;
            (Arc::new(db), Arc::new(blobs))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            (
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryBlobStore::new(&config.storage_bucket)),
            )
        }
    };

    // Vision model client
    let vision = Arc::new(MoondreamClient::new(&config)?);
    tracing::info!(base_url = %config.moondream_base_url, "Moondream client initialized");

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, blobs, vision));

    // Build router
    let app = animago_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), tracing_subscriber::filter::ParseError> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("animago_api=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
