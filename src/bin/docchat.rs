use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use docchat::chat::openai::OpenAiChat;
use docchat::embedder::openai::OpenAiEmbedder;
use docchat::{AppContext, ChatResponder, EmbeddingClient, ServerCli, VectorStore};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let cli = ServerCli::parse();
    init_tracing(&cli);
    let config = cli.build_config()?;
    info!(version = env!("CARGO_PKG_VERSION"), "docchat starting");

    let embedder = OpenAiEmbedder::new(
        &config.openai_api_key,
        &config.openai_base_url,
        config.embedding_model.clone(),
        config.request_timeout,
    )?;
    let chat = OpenAiChat::new(
        &config.openai_api_key,
        &config.openai_base_url,
        config.chat_model.clone(),
        config.request_timeout,
    )?;
    let embedding_client = EmbeddingClient::new(Arc::new(embedder), config.embed_retry);

    // The store must be complete before the listener is bound.
    let store = VectorStore::from_document(&config.document, config.chunk_size, &embedding_client)
        .with_context(|| format!("failed to index {}", config.document.display()))?;
    let ctx = AppContext::new(
        store,
        embedding_client,
        ChatResponder::new(Arc::new(chat)),
        config.top_k,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(docchat::serve(ctx, config.bind))
}

fn init_tracing(cli: &ServerCli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}
