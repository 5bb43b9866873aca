//! Language model invocation.
//!
//! The [`ModelClient`] trait decouples the repair pipeline from the actual
//! model backend (an OpenAI-compatible chat completions API). Tests use
//! scripted clients that return predetermined responses without any network.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::io::config::ModelConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One model invocation: a single user message at a fixed temperature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

impl ModelRequest {
    pub fn user_prompt(model: &str, temperature: f32, prompt: impl Into<String>) -> Self {
        Self {
            model: model.to_string(),
            temperature,
            messages: vec![ChatMessage::user(prompt)],
        }
    }

    /// Text of the (single) user message.
    pub fn prompt(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Abstraction over model backends. Returns the free-form response text.
pub trait ModelClient {
    fn complete(&self, request: &ModelRequest) -> Result<String>;
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Debug)]
pub struct OpenAiClient {
    client: Client,
    url_chat: String,
}

impl OpenAiClient {
    /// Build a client from config, reading the API key from `config.api_key_env`.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("read API key from ${}", config.api_key_env))?;
        Self::new(config, &api_key)
    }

    pub fn new(config: &ModelConfig, api_key: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("invalid API key header")?,
        );

        let mut builder = Client::builder().default_headers(headers);
        // reqwest's blocking client defaults to a 30s timeout; an unset timeout
        // must mean no limit at all.
        builder = builder.timeout(config.timeout_secs.map(Duration::from_secs));
        let client = builder.build().context("build HTTP client")?;

        let url_chat = format!("{}/chat/completions", config.endpoint.trim_end_matches('/'));
        info!(model = %config.model, url = %url_chat, "model client initialized");
        Ok(Self { client, url_chat })
    }
}

impl ModelClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %request.model, prompt_len = request.prompt().len()))]
    fn complete(&self, request: &ModelRequest) -> Result<String> {
        debug!(url = %self.url_chat, "POST chat completion");
        let response = self
            .client
            .post(&self.url_chat)
            .json(request)
            .send()
            .context("send chat completion request")?;

        let status = response.status();
        let body = response.text().context("read chat completion body")?;
        if !status.is_success() {
            warn!(%status, "chat completion rejected");
            bail!("HTTP {}: {}", status, snippet(&body, 300));
        }
        parse_chat_response(&body)
    }
}

/// Extract the first choice's content from a chat completion body.
pub fn parse_chat_response(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .with_context(|| format!("decode chat completion: {}", snippet(body, 200)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| anyhow!("chat completion returned no choices"))
}

/// Truncate a string for display (Unicode-safe).
fn snippet(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_single_user_message() {
        let request = ModelRequest::user_prompt("gpt-4o-mini", 0.1, "fix {this}");
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"].as_array().expect("messages").len(), 1);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "fix {this}");
        assert!(value["temperature"].as_f64().expect("temperature") < 0.2);
        assert_eq!(request.prompt(), "fix {this}");
    }

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Output:\nx = 1"}},{"message":{"content":"other"}}]}"#;
        assert_eq!(parse_chat_response(body).expect("parse"), "Output:\nx = 1");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let err = parse_chat_response(r#"{"choices":[]}"#).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn null_content_is_empty_text() {
        let body = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert_eq!(parse_chat_response(body).expect("parse"), "");
    }

    #[test]
    fn malformed_body_is_an_error() {
        let err = parse_chat_response("<html>bad gateway</html>").unwrap_err();
        assert!(err.to_string().contains("decode chat completion"));
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(snippet("héllo", 2), "hé");
        assert_eq!(snippet("ok", 10), "ok");
    }

    #[test]
    fn client_builds_chat_url_from_endpoint() {
        let config = ModelConfig {
            endpoint: "http://localhost:8080/v1/".to_string(),
            ..ModelConfig::default()
        };
        let client = OpenAiClient::new(&config, "test-key").expect("client");
        assert_eq!(client.url_chat, "http://localhost:8080/v1/chat/completions");
    }
}
