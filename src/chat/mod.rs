//! Grounding prompt assembly and chat-completion backends.

pub mod fake;
pub mod openai;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Chat model used when none is configured.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";

/// Instruction that confines the model to the supplied context and keeps it from
/// mentioning that the answer comes from a document.
pub const SYSTEM_PROMPT: &str = "Responde con claridad y precisión solo usando el siguiente contexto. \
No digas frases como 'según el documento'. Responde como si tú supieras la información directamente.";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// End-user turn.
    User,
}

/// One entry of the prompt sent to the chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author.
    pub role: Role,
    /// Message body.
    pub content: String,
}

impl ChatMessage {
    /// System-role message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Messages-in, text-out completion capability. Implementations do not retry.
pub trait ChatModel: Send + Sync {
    /// Returns the text of the first completion choice.
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Builds the two-message grounding prompt: fixed instructions, then context and question.
pub fn build_messages<S: AsRef<str>>(question: &str, fragments: &[S]) -> Vec<ChatMessage> {
    let context = fragments
        .iter()
        .map(|fragment| fragment.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Contexto:\n{context}\n\nPregunta: {question}")),
    ]
}

/// Answers questions from retrieved fragments through a [`ChatModel`].
///
/// Failures are returned as-is; unlike embedding, chat calls are not retried.
#[derive(Clone)]
pub struct ChatResponder {
    model: Arc<dyn ChatModel>,
}

impl ChatResponder {
    /// Wraps a chat backend.
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Model identifier of the wrapped backend.
    pub fn model(&self) -> &str {
        self.model.model()
    }

    /// Generates an answer grounded in `fragments`.
    pub fn answer<S: AsRef<str>>(&self, question: &str, fragments: &[S]) -> Result<String, ChatError> {
        let messages = build_messages(question, fragments);
        Ok(self.model.complete(&messages)?)
    }
}
