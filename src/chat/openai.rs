//! OpenAI-compatible chat completions backend.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatModel};
use crate::embedder::openai::auth_headers;

/// Blocking client for `/chat/completions`. No streaming, no sampling overrides.
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiChat {
    /// Builds a chat client; `timeout` bounds each request.
    pub fn new(api_key: &str, base_url: &str, model: String, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OpenAI API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing chat model name");
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(auth_headers(api_key)?)
            .build()
            .context("failed to build OpenAI chat HTTP client")?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
        })
    }
}

impl ChatModel for OpenAiChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .context("failed to call OpenAI chat completions")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("OpenAI returned {}: {}", status, text);
        }
        let parsed: ChatResponse = resp.json().context("failed to parse OpenAI response")?;
        first_choice(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn first_choice(parsed: ChatResponse) -> Result<String> {
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .context("OpenAI response contained no choices")
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_choice() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"uno"}},{"index":1,"message":{"role":"assistant","content":"dos"}}]}"#,
        )
        .expect("parse");
        assert_eq!(first_choice(parsed).expect("choice"), "uno");
    }

    #[test]
    fn no_choices_is_an_error() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("parse");
        assert!(first_choice(parsed).is_err());
    }

    #[test]
    fn request_body_has_no_sampling_parameters() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let body = serde_json::to_value(ChatRequest {
            model: "gpt-4",
            messages: &messages,
        })
        .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4",
                "messages": [
                    {"role": "system", "content": "s"},
                    {"role": "user", "content": "u"}
                ]
            })
        );
    }
}
