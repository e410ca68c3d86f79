// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vision inference client (Moondream cloud API).
//!
//! The model is used in two steps: an image is encoded once, then queried
//! with natural-language prompts.

use crate::config::Config;
use crate::models::RasterImage;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// Prompt for the species label. The answer is expected as `Species: <name>`.
pub const SPECIES_PROMPT: &str =
    "What species is in this image? Answer in the form 'Species: <common name>'.";

/// Prompt for the free-text description.
pub const DESCRIPTION_PROMPT: &str =
    "Describe the animal in this image and what it is doing in one or two sentences.";

/// Separator between the label prefix and the species name.
const LABEL_SEPARATOR: &str = ": ";

/// Extract the species name from a `Species: <name>` answer.
///
/// Falls back to the raw answer, untrimmed, when the separator is missing.
pub fn extract_species_label(answer: &str) -> &str {
    match answer.split_once(LABEL_SEPARATOR) {
        Some((_, label)) => label,
        None => answer,
    }
}

/// An image prepared for querying.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    data_url: String,
}

impl EncodedImage {
    /// Encode an image as a base64 `data:` URL.
    pub fn from_image(image: &RasterImage) -> Self {
        Self {
            data_url: format!(
                "data:{};base64,{}",
                image.mime_type(),
                BASE64.encode(image.bytes())
            ),
        }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

/// Vision inference errors.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Vision request failed: {0}")]
    Transport(String),

    #[error("Vision service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Unexpected vision response: {0}")]
    InvalidResponse(String),
}

/// A hosted vision-language model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Prepare an image for one or more queries.
    async fn encode(&self, image: &RasterImage) -> Result<EncodedImage, VisionError>;

    /// Ask a question about an encoded image; returns the answer text.
    async fn query(&self, image: &EncodedImage, question: &str) -> Result<String, VisionError>;
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    image_url: &'a str,
    question: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    answer: String,
}

/// Moondream cloud API client.
#[derive(Clone)]
pub struct MoondreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MoondreamClient {
    /// Create a client from configuration.
    ///
    /// The HTTP client timeout is the per-attempt inference timeout.
    pub fn new(config: &Config) -> Result<Self, VisionError> {
        let http = reqwest::Client::builder()
            .timeout(config.inference_timeout)
            .build()
            .map_err(|e| VisionError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.moondream_base_url.clone(),
            api_key: config.moondream_api_key.clone(),
        })
    }
}

#[async_trait]
impl VisionModel for MoondreamClient {
    async fn encode(&self, image: &RasterImage) -> Result<EncodedImage, VisionError> {
        Ok(EncodedImage::from_image(image))
    }

    async fn query(&self, image: &EncodedImage, question: &str) -> Result<String, VisionError> {
        let url = format!("{}/query", self.base_url);
        let body = QueryRequest {
            image_url: image.data_url(),
            question,
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .header("X-Moondream-Auth", self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| VisionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Moondream API error");
            return Err(VisionError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| VisionError::Transport(e.to_string()))?;

        parse_answer(&body)
    }
}

/// Pull the answer out of a `/query` response body, exactly as sent.
fn parse_answer(body: &str) -> Result<String, VisionError> {
    serde_json::from_str::<QueryResponse>(body)
        .map(|parsed| parsed.answer)
        .map_err(|e| VisionError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::sample_image;
    use ::image::ImageFormat;

    #[test]
    fn test_extract_species_label_structured_answer() {
        assert_eq!(extract_species_label("Species: Red Fox"), "Red Fox");
    }

    #[test]
    fn test_extract_species_label_unstructured_answer() {
        assert_eq!(
            extract_species_label("A small reddish mammal"),
            "A small reddish mammal"
        );
    }

    #[test]
    fn test_extract_species_label_splits_on_first_separator() {
        assert_eq!(
            extract_species_label("Species: Fox: red variant"),
            "Fox: red variant"
        );
    }

    #[test]
    fn test_extract_species_label_requires_space_after_colon() {
        assert_eq!(extract_species_label("Species:Fox"), "Species:Fox");
    }

    #[test]
    fn test_parse_answer_keeps_raw_text() {
        let answer = parse_answer(r#"{"answer": " a grey squirrel\n", "request_id": "r1"}"#).unwrap();
        assert_eq!(answer, " a grey squirrel\n");
        assert_eq!(extract_species_label(&answer), " a grey squirrel\n");
    }

    #[test]
    fn test_parse_answer_rejects_missing_answer() {
        let err = parse_answer(r#"{"error": "quota"}"#).unwrap_err();
        assert!(matches!(err, VisionError::InvalidResponse(_)));
    }

    #[test]
    fn test_encoded_image_is_data_url() {
        let image = RasterImage::from_bytes(sample_image(ImageFormat::Jpeg)).unwrap();
        let encoded = EncodedImage::from_image(&image);
        assert!(encoded.data_url().starts_with("data:image/jpeg;base64,"));
    }
}
