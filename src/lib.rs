#![warn(missing_docs)]
//! Core library entry points for the docchat retrieval-augmented chat server.

pub mod chat;
pub mod chunker;
pub mod config;
pub mod document;
pub mod embedder;
pub mod error;
pub mod retriever;
pub mod retry;
pub mod server;
pub mod vector_store;

pub use chat::{build_messages, ChatMessage, ChatModel, ChatResponder, Role};
pub use chunker::{chunk_text, Fragment, DEFAULT_CHUNK_SIZE};
pub use config::{ServerCli, ServerConfig};
pub use document::load_document_text;
pub use embedder::{Embedder, EmbeddingClient};
pub use error::{ChatError, EmbeddingError, LoadError};
pub use retriever::{cosine_similarity, Retriever, ScoredFragment, DEFAULT_TOP_K};
pub use retry::{Backoff, RetryPolicy};
pub use server::{build_router, serve, AppContext, AppError};
pub use vector_store::{StoreEntry, VectorStore};
