// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod biodex;
pub mod ingest;
pub mod nearby;
pub mod retry;
pub mod storage;
pub mod vision;

pub use biodex::{build_biodex, load_biodex, Biodex, BiodexEntry};
pub use ingest::{
    IngestError, IngestOutcome, IngestService, PromptKind, SightingSubmission,
    UserUpdateWarning, XP_PER_SIGHTING,
};
pub use nearby::nearby_sightings;
pub use retry::{retry_with_backoff, RetryError, RetryPolicy};
pub use storage::{BlobError, BlobStore, GcsBlobStore, MemoryBlobStore};
pub use vision::{MoondreamClient, VisionError, VisionModel};
