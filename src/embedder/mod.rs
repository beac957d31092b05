//! Embedding backends and the retrying client used by the store and the server.

pub mod fake;
pub mod openai;

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::error::EmbeddingError;
use crate::retry::RetryPolicy;

/// Embedding model used when none is configured.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Single-shot text-to-vector capability. Implementations do not retry.
pub trait Embedder: Send + Sync {
    /// Embeds one input.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Wraps an [`Embedder`] with a [`RetryPolicy`].
#[derive(Clone)]
pub struct EmbeddingClient {
    backend: Arc<dyn Embedder>,
    policy: RetryPolicy,
}

impl EmbeddingClient {
    /// Builds a client around `backend`.
    pub fn new(backend: Arc<dyn Embedder>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Model identifier of the wrapped backend.
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Embeds `text`, retrying per the policy. Fails once every attempt has failed.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let max_attempts = self.policy.max_attempts();
        self.policy
            .run(
                |_| self.backend.embed(text),
                |attempt, err| {
                    warn!(
                        attempt,
                        max_attempts,
                        model = self.backend.model(),
                        error = %format!("{err:#}"),
                        "embedding attempt failed"
                    );
                },
            )
            .map_err(|err| EmbeddingError {
                attempts: err.attempts,
                source: err.last,
            })
    }
}
