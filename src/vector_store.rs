//! In-memory store of embedded fragments, built once at startup.

use std::path::Path;

use tracing::{debug, info};

use crate::chunker::{chunk_text, Fragment};
use crate::document::load_document_text;
use crate::embedder::EmbeddingClient;
use crate::error::EmbeddingError;

/// Fragment paired with its embedding.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// Source fragment.
    pub fragment: Fragment,
    /// Model embedding vector.
    pub embedding: Vec<f32>,
}

/// Read-only sequence of [`StoreEntry`] values in chunk order.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    entries: Vec<StoreEntry>,
}

impl VectorStore {
    /// Embeds every fragment in order, one call at a time.
    ///
    /// The first fragment whose embedding fails aborts the build.
    pub fn build(
        fragments: Vec<Fragment>,
        client: &EmbeddingClient,
    ) -> Result<Self, EmbeddingError> {
        let total = fragments.len();
        let mut entries = Vec::with_capacity(total);
        for fragment in fragments {
            debug!(
                fragment = fragment.index + 1,
                total,
                chars = fragment.char_len(),
                "embedding fragment"
            );
            let embedding = client.embed(&fragment.text)?;
            entries.push(StoreEntry {
                fragment,
                embedding,
            });
        }
        let store = Self { entries };
        info!(
            fragments = store.len(),
            dimensions = store.dimensions().unwrap_or(0),
            model = client.model(),
            "vector store ready"
        );
        Ok(store)
    }

    /// Loads `path`, chunks it into `chunk_size`-character fragments and embeds them.
    pub fn from_document(
        path: &Path,
        chunk_size: usize,
        client: &EmbeddingClient,
    ) -> anyhow::Result<Self> {
        info!(document = %path.display(), "loading document");
        let text = load_document_text(path)?;
        let fragments = chunk_text(&text, chunk_size);
        info!(
            chars = text.chars().count(),
            fragments = fragments.len(),
            chunk_size,
            "document split into fragments"
        );
        Ok(Self::build(fragments, client)?)
    }

    /// Wraps pre-computed entries.
    pub fn from_entries(entries: Vec<StoreEntry>) -> Self {
        Self { entries }
    }

    /// Every entry, in chunk order.
    pub fn all(&self) -> &[StoreEntry] {
        &self.entries
    }

    /// Number of stored fragments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the document produced no fragments.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding width of the first entry, if any.
    pub fn dimensions(&self) -> Option<usize> {
        self.entries.first().map(|entry| entry.embedding.len())
    }
}
