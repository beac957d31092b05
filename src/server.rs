//! HTTP surface: a single `POST /chat` route over an injected [`AppContext`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::chat::ChatResponder;
use crate::embedder::EmbeddingClient;
use crate::error::{ChatError, EmbeddingError};
use crate::retriever::Retriever;
use crate::vector_store::VectorStore;

/// Everything a request needs, built once at startup and shared read-only.
#[derive(Clone)]
pub struct AppContext {
    store: Arc<VectorStore>,
    embedder: EmbeddingClient,
    chat: ChatResponder,
    top_k: usize,
}

impl AppContext {
    /// Assembles the request context. `top_k` is clamped to at least one.
    pub fn new(
        store: VectorStore,
        embedder: EmbeddingClient,
        chat: ChatResponder,
        top_k: usize,
    ) -> Self {
        Self {
            store: Arc::new(store),
            embedder,
            chat,
            top_k: top_k.max(1),
        }
    }

    /// The fully populated store.
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Fragments retrieved per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embeds the question, retrieves the closest fragments and asks the chat model.
    ///
    /// A blank question skips embedding and retrieval and is answered with an
    /// empty context. Blocks on network calls.
    pub fn answer(&self, question: &str) -> Result<String, AppError> {
        let fragments = if question.trim().is_empty() {
            Vec::new()
        } else {
            let query = self.embedder.embed(question)?;
            Retriever::new(&self.store).retrieve(&query, self.top_k)
        };
        info!(
            question_chars = question.chars().count(),
            fragments = fragments.len(),
            model = self.chat.model(),
            "answering question"
        );
        Ok(self.chat.answer(question, &fragments)?)
    }
}

/// Request-level failure, rendered as `{"error": {"kind", "message"}}`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Query embedding failed after every retry.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Chat completion failed.
    #[error(transparent)]
    Chat(#[from] ChatError),
    /// Body could not be decoded as JSON.
    #[error("invalid request body: {0}")]
    InvalidRequest(String),
    /// Worker task failed before producing an answer.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Embedding(_) => "embedding_error",
            AppError::Chat(_) => "chat_error",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status used for the error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Embedding(_) | AppError::Chat(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

/// `POST /chat` body. A missing or null `pregunta` is an empty question.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    /// Question text.
    #[serde(default)]
    pub pregunta: Option<String>,
}

/// `POST /chat` success body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    /// Answer text.
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

/// Router exposing `POST /chat` with permissive CORS.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/chat", post(chat_handler))
        .layer(cors)
        .with_state(ctx)
}

async fn chat_handler(
    State(ctx): State<AppContext>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected chat request body");
        AppError::InvalidRequest(rejection.body_text())
    })?;
    let question = request.pregunta.unwrap_or_default();
    let start = Instant::now();
    let result = tokio::task::spawn_blocking(move || ctx.answer(&question))
        .await
        .map_err(|err| AppError::Internal(format!("answer task join error: {err}")))?;
    match result {
        Ok(content) => {
            info!(
                latency_ms = start.elapsed().as_secs_f64() * 1000.0,
                "chat request completed"
            );
            Ok(Json(ChatReply { content }))
        }
        Err(err) => {
            error!(kind = err.kind(), error = %err, "chat request failed");
            Err(err)
        }
    }
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(ctx: AppContext, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, fragments = ctx.store().len(), "docchat listening");
    axum::serve(listener, build_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::fake::FakeChat;
    use crate::embedder::fake::FakeEmbedder;
    use crate::retry::RetryPolicy;

    fn context(embedder: FakeEmbedder, chat: Arc<FakeChat>) -> AppContext {
        AppContext::new(
            VectorStore::default(),
            EmbeddingClient::new(Arc::new(embedder), RetryPolicy::immediate(3)),
            ChatResponder::new(chat),
            3,
        )
    }

    #[test]
    fn blank_question_skips_embedding() {
        let chat = Arc::new(FakeChat::answering("ok"));
        let ctx = context(FakeEmbedder::new(4).failing_first(usize::MAX), chat.clone());
        assert_eq!(ctx.answer("   ").expect("answer"), "ok");
        assert_eq!(chat.calls(), 1);
    }

    #[test]
    fn errors_carry_kind_and_status() {
        let chat = Arc::new(FakeChat::answering("unused"));
        let ctx = context(FakeEmbedder::new(4).failing_first(usize::MAX), chat.clone());
        let err = ctx.answer("hola").expect_err("embedding fails");
        assert_eq!(err.kind(), "embedding_error");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(chat.calls(), 0);

        let ctx = context(FakeEmbedder::new(4), Arc::new(FakeChat::failing("nope")));
        let err = ctx.answer("hola").expect_err("chat fails");
        assert_eq!(err.kind(), "chat_error");
    }

    #[test]
    fn missing_or_null_question_deserializes_as_none() {
        let missing: ChatRequest = serde_json::from_str("{}").expect("parse");
        assert_eq!(missing.pregunta, None);
        let null: ChatRequest = serde_json::from_str(r#"{"pregunta":null}"#).expect("parse");
        assert_eq!(null.pregunta, None);
    }
}
