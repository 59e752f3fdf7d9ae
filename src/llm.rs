//! Chat-completion providers.
//!
//! Every judgment the chatbot makes — query refinement, continuation
//! decisions, relevance checks, and the final reply — goes through the
//! [`LlmProvider`] trait. Two HTTP backends are provided: any
//! OpenAI-compatible `/v1/chat/completions` endpoint and Ollama's
//! `/api/chat`.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;

/// A chat message.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} — {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Trait for chat-completion backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and return the assistant's reply text.
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}

/// Create the provider named by the configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiChat::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        other => Err(LlmError::NotConfigured(format!(
            "unknown llm provider '{}'",
            other
        ))),
    }
}

/// Ask a one-shot yes/no question and parse the verdict.
///
/// The reply is scanned for a leading yes/no token; anything else is a
/// parse error so the caller can decide how to recover.
pub async fn yes_or_no(
    llm: &dyn LlmProvider,
    system: &str,
    question: &str,
) -> Result<bool, LlmError> {
    let messages = [
        Message::system(system.to_string()),
        Message::user(format!(
            "{}\n\nAnswer with a single word: yes or no.",
            question
        )),
    ];
    let response = llm.complete(&messages).await?;
    parse_yes_no(&response)
        .ok_or_else(|| LlmError::Parse(format!("expected yes/no, got: {}", response.trim())))
}

/// Extract a yes/no verdict from a model reply.
pub fn parse_yes_no(response: &str) -> Option<bool> {
    let first = response
        .trim()
        .trim_start_matches(['"', '\'', '*', '`'])
        .split(|c: char| !c.is_alphabetic())
        .next()?
        .to_lowercase();

    match first.as_str() {
        "yes" | "y" | "true" => Some(true),
        "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client, LlmError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

// ============ OpenAI-compatible ============

pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LlmError::NotConfigured("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            base_url,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );

        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        let body = serde_json::json!({
            "model": self.model,
            "messages": api_messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        debug!("chat completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Parse("missing choices[0].message.content".into()))?
            .to_string();

        Ok(content)
    }
}

// ============ Ollama ============

pub struct OllamaChat {
    client: reqwest::Client,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            model: config.model.clone(),
            base_url,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaChat {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        let body = serde_json::json!({
            "model": self.model,
            "messages": api_messages,
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        debug!("chat completion request to {}", url);

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Parse("missing message.content".into()))?
            .to_string();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_yes_variants() {
        assert_eq!(parse_yes_no("yes"), Some(true));
        assert_eq!(parse_yes_no("Yes."), Some(true));
        assert_eq!(parse_yes_no("  YES, we should keep searching"), Some(true));
        assert_eq!(parse_yes_no("\"Yes\""), Some(true));
    }

    #[test]
    fn parse_no_variants() {
        assert_eq!(parse_yes_no("no"), Some(false));
        assert_eq!(parse_yes_no("No — the context suffices"), Some(false));
        assert_eq!(parse_yes_no("n"), Some(false));
    }

    #[test]
    fn parse_garbage_is_none() {
        assert_eq!(parse_yes_no("maybe"), None);
        assert_eq!(parse_yes_no(""), None);
    }
}
