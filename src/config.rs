//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. Missing required values are fatal.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which backend holds users, sightings and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Firestore documents plus Cloud Storage blobs
    Firestore,
    /// In-process maps, for local development
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GCP project ID
    pub gcp_project_id: String,
    /// Cloud Storage bucket for sighting pictures
    pub storage_bucket: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Moondream API base URL
    pub moondream_base_url: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,

    // --- Inference retry policy ---
    pub inference_max_attempts: u32,
    pub inference_retry_delay: Duration,
    /// Per-attempt timeout for inference calls
    pub inference_timeout: Duration,
    /// Deadline for each document store read or write
    pub store_timeout: Duration,

    /// Largest accepted request body (multipart image uploads)
    pub max_upload_bytes: usize,

    // --- Secrets ---
    /// Moondream API key
    pub moondream_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

const DEFAULT_MOONDREAM_BASE_URL: &str = "https://api.moondream.ai/v1";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-bucket".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            moondream_base_url: "http://127.0.0.1:9".to_string(),
            port: 8000,
            store_backend: StoreBackend::Memory,
            inference_max_attempts: 3,
            inference_retry_delay: Duration::from_millis(1),
            inference_timeout: Duration::from_secs(5),
            store_timeout: Duration::from_secs(5),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            moondream_api_key: "test_moondream_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "sighting_pics".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            moondream_base_url: env::var("MOONDREAM_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_MOONDREAM_BASE_URL.to_string()),
            port: parse_or("PORT", 8000)?,
            store_backend: env::var("STORE_BACKEND")
                .map(|v| v.parse())
                .unwrap_or(Ok(StoreBackend::Firestore))?,

            inference_max_attempts: parse_or("INFERENCE_MAX_ATTEMPTS", 3)?,
            inference_retry_delay: Duration::from_millis(parse_or(
                "INFERENCE_RETRY_DELAY_MS",
                1000,
            )?),
            inference_timeout: Duration::from_secs(parse_or("INFERENCE_TIMEOUT_SECS", 30)?),
            store_timeout: Duration::from_secs(parse_or("STORE_TIMEOUT_SECS", 10)?),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,

            moondream_api_key: env::var("MOONDREAM_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MOONDREAM_API_KEY"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
