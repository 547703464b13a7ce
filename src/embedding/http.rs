//! Embedding provider backed by a model server.
//!
//! Each buffer is encoded as PNG, wrapped in a base64 data URI and posted as
//! JSON:
//!
//! ```text
//! POST <endpoint>
//! {"model": "<model>", "input": "data:image/png;base64,…"}
//! ```
//!
//! Two response shapes are accepted: `{"embedding": [..]}` and the
//! OpenAI-style `{"data": [{"embedding": [..]}]}`.

use std::io::Cursor;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageFormat, RgbaImage};
use reqwest::blocking::Client;
use serde_json::Value;

use crate::embedding::{EmbeddingProvider, EmbeddingVector};
use crate::error::{ShrinkError, ShrinkResult};
use crate::texture::ImageBuffer;

const PROVIDER: &str = "http";

/// Connection settings for [`HttpEmbeddingProvider`].
#[derive(Debug, Clone)]
pub struct HttpEmbeddingConfig {
    /// Full URL of the embeddings route
    pub endpoint: String,
    /// Model name forwarded in the request body, if the server needs one
    pub model: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpEmbeddingConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: None,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpEmbeddingProvider {
    client: Client,
    config: HttpEmbeddingConfig,
}

impl HttpEmbeddingProvider {
    pub fn new(config: HttpEmbeddingConfig) -> ShrinkResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ShrinkError::external("reqwest", e).with_operation("build HTTP client"))?;
        Ok(Self { client, config })
    }

    fn request_body(&self, buffer: &ImageBuffer) -> ShrinkResult<Value> {
        let png = encode_png(buffer)?;
        let input = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(png)
        );
        let mut body = serde_json::json!({ "input": input });
        if let Some(model) = &self.config.model {
            body["model"] = Value::String(model.clone());
        }
        Ok(body)
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn embed(&self, buffer: &ImageBuffer) -> ShrinkResult<EmbeddingVector> {
        let body = self.request_body(buffer)?;
        log::trace!(
            "POST {} for {}x{} buffer",
            self.config.endpoint,
            buffer.width(),
            buffer.height()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .map_err(|e| {
                ShrinkError::embedding_source(PROVIDER, "request failed", e)
                    .with_context(self.config.endpoint.clone())
                    .with_recovery_suggestion("Make sure the embedding server is reachable")
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(ShrinkError::embedding(
                PROVIDER,
                format!("server returned {}: {}", status, detail),
            )
            .with_metadata("status", status.as_u16().to_string()));
        }

        let value: Value = response
            .json()
            .map_err(|e| ShrinkError::embedding_source(PROVIDER, "response is not JSON", e))?;
        parse_embedding_response(&value)
            .map(EmbeddingVector::from)
            .ok_or_else(|| ShrinkError::embedding(PROVIDER, "response carries no usable embedding"))
    }
}

/// Extract a non-empty, all-numeric embedding from a server response.
pub fn parse_embedding_response(value: &Value) -> Option<Vec<f32>> {
    let array = value
        .get("embedding")
        .or_else(|| value.get("data")?.get(0)?.get("embedding"))?
        .as_array()?;
    if array.is_empty() {
        return None;
    }
    array
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

fn encode_png(buffer: &ImageBuffer) -> ShrinkResult<Vec<u8>> {
    let rgba = RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.pixels().to_vec())
        .ok_or_else(|| {
            ShrinkError::validation(
                "pixels",
                "does not match dimensions",
                buffer.pixels().len().to_string(),
            )
        })?;
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(rgba)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ShrinkError::embedding_source(PROVIDER, "could not encode PNG", e))?;
    Ok(bytes)
}
