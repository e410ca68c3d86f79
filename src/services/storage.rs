// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blob storage for sighting pictures.
//!
//! Production uses the Cloud Storage JSON API (simple media upload) with
//! OAuth tokens from the default GCP credentials. Set STORAGE_EMULATOR_HOST
//! to talk to a local emulator without authentication.

use crate::models::RasterImage;
use async_trait::async_trait;
use axum::body::Bytes;
use dashmap::DashMap;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;

const GCS_API_BASE: &str = "https://storage.googleapis.com";
const GCS_WRITE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Object key for a sighting's picture.
pub fn sighting_object_key(user_id: &str, sighting_id: &str, extension: &str) -> String {
    format!("sightings/{}/{}.{}", user_id, sighting_id, extension)
}

/// Percent-encode each path segment of an object key for use in a URL.
fn encode_object_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Blob storage errors.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Storage authentication failed: {0}")]
    Auth(String),

    #[error("Storage request failed: {0}")]
    Transport(String),

    #[error("Storage returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Object storage that hands back publicly resolvable URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `image` under `key` and return its public URL.
    async fn upload(&self, key: &str, image: &RasterImage) -> Result<String, BlobError>;
}

/// Cloud Storage bucket client.
#[derive(Clone)]
pub struct GcsBlobStore {
    http: reqwest::Client,
    bucket: String,
    api_base: String,
    /// None when talking to the emulator
    auth: Option<Arc<gcloud_sdk::GoogleAuthTokenGenerator>>,
}

impl GcsBlobStore {
    pub async fn new(bucket: &str) -> Result<Self, BlobError> {
        let http = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| BlobError::Transport(e.to_string()))?;

        if let Ok(host) = std::env::var("STORAGE_EMULATOR_HOST") {
            let host = host.trim_end_matches('/');
            let api_base = if host.starts_with("http") {
                host.to_string()
            } else {
                format!("http://{}", host)
            };
            tracing::info!(bucket, api_base = %api_base, "Using Cloud Storage emulator");
            return Ok(Self {
                http,
                bucket: bucket.to_string(),
                api_base,
                auth: None,
            });
        }

        let auth = gcloud_sdk::GoogleAuthTokenGenerator::new(
            gcloud_sdk::TokenSourceType::Default,
            vec![GCS_WRITE_SCOPE.to_string()],
        )
        .await
        .map_err(|e| BlobError::Auth(e.to_string()))?;

        tracing::info!(bucket, "Cloud Storage client initialized");

        Ok(Self {
            http,
            bucket: bucket.to_string(),
            api_base: GCS_API_BASE.to_string(),
            auth: Some(Arc::new(auth)),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_base,
            self.bucket,
            encode_object_path(key)
        )
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn upload(&self, key: &str, image: &RasterImage) -> Result<String, BlobError> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.api_base, self.bucket);

        let mut request = self
            .http
            .post(&url)
            .query(&[("uploadType", "media"), ("name", key)])
            .header(CONTENT_TYPE, image.mime_type())
            .body(image.bytes().clone());

        if let Some(auth) = &self.auth {
            let token = auth
                .create_token()
                .await
                .map_err(|e| BlobError::Auth(e.to_string()))?;
            request = request.header(AUTHORIZATION, token.header_value());
        }

        let response = request
            .send()
            .await
            .map_err(|e| BlobError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlobError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(bucket = %self.bucket, key, bytes = image.len(), "Image uploaded");
        Ok(self.public_url(key))
    }
}

/// In-process blob store for local development and tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    bucket: String,
    objects: DashMap<String, Bytes>,
}

impl MemoryBlobStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, image: &RasterImage) -> Result<String, BlobError> {
        self.objects.insert(key.to_string(), image.bytes().clone());
        Ok(format!("memory://{}/{}", self.bucket, key))
    }
}
