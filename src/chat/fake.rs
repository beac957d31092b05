//! Scripted chat model for tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use super::{ChatMessage, ChatModel};

enum Script {
    Answer(String),
    Echo,
    Fail(String),
}

/// Records the last prompt and replies from a fixed script.
pub struct FakeChat {
    script: Script,
    last_prompt: Mutex<Option<Vec<ChatMessage>>>,
    calls: AtomicUsize,
}

impl FakeChat {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            last_prompt: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers `answer`.
    pub fn answering(answer: impl Into<String>) -> Self {
        Self::with_script(Script::Answer(answer.into()))
    }

    /// Answers with the content of the last (user) message.
    pub fn echo() -> Self {
        Self::with_script(Script::Echo)
    }

    /// Always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    /// Prompt received by the most recent call.
    pub fn last_prompt(&self) -> Option<Vec<ChatMessage>> {
        self.last_prompt
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChatModel for FakeChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_prompt
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(messages.to_vec());
        match &self.script {
            Script::Answer(answer) => Ok(answer.clone()),
            Script::Echo => Ok(messages
                .last()
                .map(|message| message.content.clone())
                .unwrap_or_default()),
            Script::Fail(message) => Err(anyhow!("{message}")),
        }
    }

    fn model(&self) -> &str {
        "fake-chat"
    }
}
