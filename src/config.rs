//! Command-line and environment configuration for the chat server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::chat::DEFAULT_CHAT_MODEL;
use crate::chunker::DEFAULT_CHUNK_SIZE;
use crate::embedder::DEFAULT_EMBEDDING_MODEL;
use crate::retriever::DEFAULT_TOP_K;
use crate::retry::{Backoff, RetryPolicy};

/// Default base URL for the OpenAI-compatible API.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Flags accepted by the `docchat` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "docchat",
    about = "Answer questions about a Word document through retrieval-augmented chat"
)]
pub struct ServerCli {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "DOCCHAT_BIND", default_value = "127.0.0.1:5000")]
    pub bind: String,

    /// Path of the .docx document loaded at startup
    #[arg(long, env = "DOCCHAT_DOCUMENT", default_value = "documento.docx")]
    pub document: PathBuf,

    /// Characters per fragment
    #[arg(long, env = "DOCCHAT_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Fragments retrieved per question
    #[arg(long, env = "DOCCHAT_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// OpenAI API key used for embeddings and chat
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL for OpenAI-compatible endpoints
    #[arg(long, env = "DOCCHAT_OPENAI_BASE", default_value = DEFAULT_OPENAI_BASE)]
    pub openai_base_url: String,

    /// Embedding model identifier
    #[arg(long, env = "DOCCHAT_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Chat completion model identifier
    #[arg(long, env = "DOCCHAT_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Seconds before a single embedding or chat request times out
    #[arg(long, env = "DOCCHAT_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Attempts per embedding call before giving up
    #[arg(long, env = "DOCCHAT_EMBED_ATTEMPTS", default_value_t = 3)]
    pub embed_max_attempts: usize,

    /// Seconds to wait before retrying a failed embedding call
    #[arg(long, env = "DOCCHAT_EMBED_RETRY_SECS", default_value_t = 5)]
    pub embed_retry_delay_secs: u64,

    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable lines
    #[arg(long, default_value_t = false)]
    pub json_logs: bool,
}

/// Validated settings derived from [`ServerCli`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: SocketAddr,
    /// Source document.
    pub document: PathBuf,
    /// Characters per fragment.
    pub chunk_size: usize,
    /// Fragments per question.
    pub top_k: usize,
    /// API credential.
    pub openai_api_key: String,
    /// API base URL.
    pub openai_base_url: String,
    /// Embedding model.
    pub embedding_model: String,
    /// Chat model.
    pub chat_model: String,
    /// Per-request timeout for both external services.
    pub request_timeout: Duration,
    /// Retry policy for embedding calls.
    pub embed_retry: RetryPolicy,
}

impl ServerCli {
    /// Converts the parsed flags into a [`ServerConfig`], clamping numeric knobs to sane minimums.
    pub fn build_config(&self) -> Result<ServerConfig> {
        anyhow::ensure!(
            !self.openai_api_key.trim().is_empty(),
            "OPENAI_API_KEY must be set"
        );
        anyhow::ensure!(
            !self.embedding_model.trim().is_empty(),
            "embedding model is required"
        );
        anyhow::ensure!(!self.chat_model.trim().is_empty(), "chat model is required");
        let bind: SocketAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address {}", self.bind))?;
        let delay = Duration::from_secs(self.embed_retry_delay_secs);
        let backoff = if delay.is_zero() {
            Backoff::None
        } else {
            Backoff::Fixed(delay)
        };
        Ok(ServerConfig {
            bind,
            document: self.document.clone(),
            chunk_size: self.chunk_size.max(1),
            top_k: self.top_k.max(1),
            openai_api_key: self.openai_api_key.clone(),
            openai_base_url: self.openai_base_url.clone(),
            embedding_model: self.embedding_model.clone(),
            chat_model: self.chat_model.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            embed_retry: RetryPolicy::new(self.embed_max_attempts, backoff),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerCli {
        let mut argv = vec!["docchat", "--openai-api-key", "sk-test"];
        argv.extend_from_slice(args);
        ServerCli::try_parse_from(argv).expect("valid flags")
    }

    #[test]
    fn default_flags() {
        let config = parse(&[]).build_config().expect("config");
        assert_eq!(config.bind, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.document, PathBuf::from("documento.docx"));
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.chat_model, "gpt-4");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.embed_retry, RetryPolicy::default());
    }

    #[test]
    fn zero_knobs_are_clamped() {
        let config = parse(&[
            "--chunk-size",
            "0",
            "--top-k",
            "0",
            "--embed-max-attempts",
            "0",
            "--embed-retry-delay-secs",
            "0",
        ])
        .build_config()
        .expect("config");
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.top_k, 1);
        assert_eq!(config.embed_retry, RetryPolicy::immediate(1));
    }

    #[test]
    fn rejects_bad_bind_and_blank_key() {
        assert!(parse(&["--bind", "not-an-addr"]).build_config().is_err());
        let mut cli = parse(&[]);
        cli.openai_api_key = "   ".into();
        assert!(cli.build_config().is_err());
    }
}
