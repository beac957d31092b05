//! OpenAI-compatible embeddings backend.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::Embedder;

/// Blocking client for the `/embeddings` endpoint. One request per call, no retries.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiEmbedder {
    /// Builds a new embeddings client; `timeout` bounds each request.
    pub fn new(api_key: &str, base_url: &str, model: String, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OpenAI API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(auth_headers(api_key)?)
            .build()
            .context("failed to build OpenAI embeddings HTTP client")?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
        })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .with_context(|| format!("failed to call embeddings endpoint {}", self.endpoint))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("OpenAI embeddings request failed ({}): {}", status, body);
        }
        let parsed: EmbeddingResponse = resp
            .json()
            .context("failed to parse OpenAI embedding response")?;
        parsed
            .data
            .into_iter()
            .min_by_key(|entry| entry.index)
            .map(|entry| entry.embedding)
            .context("OpenAI returned no embedding")
    }

    fn model(&self) -> &str {
        &self.model
    }
}

pub(crate) fn auth_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth).context("invalid OpenAI API key")?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
