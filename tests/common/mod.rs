// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use animago_api::config::Config;
use animago_api::db::{FirestoreDb, MemoryStore, SightingStore, UserUpdate};
use animago_api::error::AppError;
use animago_api::middleware::create_jwt;
use animago_api::models::{Comment, RasterImage, Sighting, User};
use animago_api::routes::create_router;
use animago_api::services::vision::{EncodedImage, SPECIES_PROMPT};
use animago_api::services::{BlobError, BlobStore, MemoryBlobStore, VisionError, VisionModel};
use animago_api::AppState;
use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fake collaborators ──────────────────────────────────────

/// Vision model with canned answers.
///
/// `flaky(n)` makes the first `n` queries of each prompt fail before the
/// canned answer is returned; `failing_*` makes a prompt fail every time.
/// `flaky_encode(n)` does the same for image encoding.
#[allow(dead_code)]
pub struct ScriptedVision {
    species_answer: String,
    description_answer: String,
    fail_species: bool,
    fail_description: bool,
    flaky_failures: u32,
    encode_failures: u32,
    pub encode_calls: AtomicU32,
    pub species_calls: AtomicU32,
    pub description_calls: AtomicU32,
}

#[allow(dead_code)]
impl ScriptedVision {
    pub fn answering(species_answer: &str, description_answer: &str) -> Self {
        Self {
            species_answer: species_answer.to_string(),
            description_answer: description_answer.to_string(),
            fail_species: false,
            fail_description: false,
            flaky_failures: 0,
            encode_failures: 0,
            encode_calls: AtomicU32::new(0),
            species_calls: AtomicU32::new(0),
            description_calls: AtomicU32::new(0),
        }
    }

    pub fn failing_species(mut self) -> Self {
        self.fail_species = true;
        self
    }

    pub fn failing_description(mut self) -> Self {
        self.fail_description = true;
        self
    }

    pub fn flaky(mut self, failures: u32) -> Self {
        self.flaky_failures = failures;
        self
    }

    pub fn flaky_encode(mut self, failures: u32) -> Self {
        self.encode_failures = failures;
        self
    }

    pub fn total_calls(&self) -> u32 {
        self.species_calls.load(Ordering::SeqCst) + self.description_calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedVision {
    fn default() -> Self {
        Self::answering("Species: Red Fox", "A red fox trotting across a meadow.")
    }
}

#[async_trait]
impl VisionModel for ScriptedVision {
    async fn encode(&self, image: &RasterImage) -> Result<EncodedImage, VisionError> {
        let call = self.encode_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.encode_failures {
            return Err(VisionError::Transport("connection reset".to_string()));
        }
        Ok(EncodedImage::from_image(image))
    }

    async fn query(&self, _image: &EncodedImage, question: &str) -> Result<String, VisionError> {
        let is_species = question == SPECIES_PROMPT;
        let (calls, fail, answer) = if is_species {
            (&self.species_calls, self.fail_species, &self.species_answer)
        } else {
            (
                &self.description_calls,
                self.fail_description,
                &self.description_answer,
            )
        };

        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if fail || call <= self.flaky_failures {
            return Err(VisionError::Service {
                status: 503,
                body: "model overloaded".to_string(),
            });
        }
        Ok(answer.clone())
    }
}

/// Blob store that rejects every upload.
#[allow(dead_code)]
pub struct RejectingBlobStore;

#[async_trait]
impl BlobStore for RejectingBlobStore {
    async fn upload(&self, _key: &str, _image: &RasterImage) -> Result<String, BlobError> {
        Err(BlobError::Rejected {
            status: 403,
            body: "bucket is read-only".to_string(),
        })
    }
}

/// Memory store with injectable write failures.
#[allow(dead_code)]
pub struct FaultyStore {
    pub inner: Arc<MemoryStore>,
    pub fail_insert: bool,
    pub fail_award: bool,
}

#[async_trait]
impl SightingStore for FaultyStore {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.inner.get_user(user_id).await
    }

    async fn top_users(&self, limit: u32) -> Result<Vec<User>, AppError> {
        self.inner.top_users(limit).await
    }

    async fn award_sighting(
        &self,
        user_id: &str,
        sighting_id: &str,
        xp: i64,
    ) -> Result<UserUpdate, AppError> {
        if self.fail_award {
            return Err(AppError::Database("deadline exceeded".to_string()));
        }
        self.inner.award_sighting(user_id, sighting_id, xp).await
    }

    async fn insert_sighting(&self, sighting: &Sighting) -> Result<(), AppError> {
        if self.fail_insert {
            return Err(AppError::Database("permission denied".to_string()));
        }
        self.inner.insert_sighting(sighting).await
    }

    async fn get_sighting(&self, sighting_id: &str) -> Result<Option<Sighting>, AppError> {
        self.inner.get_sighting(sighting_id).await
    }

    async fn sightings_for_user(&self, user_id: &str) -> Result<Vec<Sighting>, AppError> {
        self.inner.sightings_for_user(user_id).await
    }

    async fn recent_sightings(&self, limit: u32) -> Result<Vec<Sighting>, AppError> {
        self.inner.recent_sightings(limit).await
    }

    async fn append_comment(
        &self,
        sighting_id: &str,
        comment: &Comment,
    ) -> Result<usize, AppError> {
        self.inner.append_comment(sighting_id, comment).await
    }
}

/// Memory store whose chosen calls never complete.
#[allow(dead_code)]
#[derive(Default)]
pub struct StallingStore {
    pub inner: Arc<MemoryStore>,
    pub stall_get_user: bool,
    pub stall_insert: bool,
    pub stall_award: bool,
}

#[async_trait]
impl SightingStore for StallingStore {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        if self.stall_get_user {
            std::future::pending::<()>().await;
        }
        self.inner.get_user(user_id).await
    }

    async fn top_users(&self, limit: u32) -> Result<Vec<User>, AppError> {
        self.inner.top_users(limit).await
    }

    async fn award_sighting(
        &self,
        user_id: &str,
        sighting_id: &str,
        xp: i64,
    ) -> Result<UserUpdate, AppError> {
        if self.stall_award {
            std::future::pending::<()>().await;
        }
        self.inner.award_sighting(user_id, sighting_id, xp).await
    }

    async fn insert_sighting(&self, sighting: &Sighting) -> Result<(), AppError> {
        if self.stall_insert {
            std::future::pending::<()>().await;
        }
        self.inner.insert_sighting(sighting).await
    }

    async fn get_sighting(&self, sighting_id: &str) -> Result<Option<Sighting>, AppError> {
        self.inner.get_sighting(sighting_id).await
    }

    async fn sightings_for_user(&self, user_id: &str) -> Result<Vec<Sighting>, AppError> {
        self.inner.sightings_for_user(user_id).await
    }

    async fn recent_sightings(&self, limit: u32) -> Result<Vec<Sighting>, AppError> {
        self.inner.recent_sightings(limit).await
    }

    async fn append_comment(
        &self,
        sighting_id: &str,
        comment: &Comment,
    ) -> Result<usize, AppError> {
        self.inner.append_comment(sighting_id, comment).await
    }
}

// ─── Test app ────────────────────────────────────────────────

/// Router plus handles on the in-memory collaborators behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub vision: Arc<ScriptedVision>,
}

/// Create a test app backed by in-memory storage and a scripted model.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(ScriptedVision::default())
}

#[allow(dead_code)]
pub fn create_test_app_with(vision: ScriptedVision) -> TestApp {
    let config = Config::test_default();
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::new(&config.storage_bucket));
    let vision = Arc::new(vision);

    let state = Arc::new(AppState::new(
        config,
        store.clone(),
        blobs.clone(),
        vision.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        blobs,
        vision,
    }
}

/// `Authorization` header value for a user, signed with the test key.
#[allow(dead_code)]
pub fn bearer(user_id: &str) -> String {
    let key = Config::test_default().jwt_signing_key;
    format!("Bearer {}", create_jwt(user_id, &key).unwrap())
}

/// Register a user in the store.
#[allow(dead_code)]
pub async fn seed_user(store: &dyn SightingStore, user_id: &str) {
    store
        .create_user(&User::new(user_id, "Test", "User"))
        .await
        .unwrap();
}

/// Encode an 8x8 solid-color picture in `format`.
fn tiny_image(format: ImageFormat) -> Vec<u8> {
    let picture = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 80, 30])));
    let mut buf = Vec::new();
    picture
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

/// A small, valid JPEG.
#[allow(dead_code)]
pub fn tiny_jpeg() -> Vec<u8> {
    tiny_image(ImageFormat::Jpeg)
}

/// A small, valid PNG.
#[allow(dead_code)]
pub fn tiny_png() -> Vec<u8> {
    tiny_image(ImageFormat::Png)
}

/// Build the image for direct service calls.
#[allow(dead_code)]
pub fn jpeg_image() -> RasterImage {
    RasterImage::from_bytes(tiny_jpeg()).unwrap()
}

// ─── Multipart ───────────────────────────────────────────────

const BOUNDARY: &str = "animago-test-boundary";

/// Hand-built `multipart/form-data` body.
#[allow(dead_code)]
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

#[allow(dead_code)]
impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    /// Standard sighting form: image plus coordinates.
    pub fn sighting(bytes: &[u8], lat: f64, lng: f64) -> Self {
        Self::new()
            .file("photo.jpg", bytes)
            .text("latitude", &lat.to_string())
            .text("longitude", &lng.to_string())
    }

    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    pub fn into_body(mut self) -> Body {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Body::from(self.body)
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
