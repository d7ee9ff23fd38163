//! AI completion backends.
//!
//! Every backend speaks the same contract: a system prompt, the recent
//! conversation, and the customer's latest utterance go in, one reply text
//! comes out. The engine must stay correct when no backend is configured or
//! every call fails, so callers treat any [`CompletionError`] as "use the
//! template instead".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use goodtable_core::config::{LlmConfig, LlmProvider};
use goodtable_core::session::{Speaker, Turn};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub history: Vec<Turn>,
    pub user_utterance: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("llm backend is not configured: {0}")]
    Unconfigured(String),
    #[error("llm call timed out after {0:?}")]
    Timeout(Duration),
    #[error("llm transport error: {0}")]
    Transport(String),
    #[error("llm backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm backend returned an empty response")]
    EmptyResponse,
    #[error("could not decode llm response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    fn model_name(&self) -> &str;
}

/// Generation knobs shared by every backend.
#[derive(Clone, Debug)]
struct Generation {
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl Generation {
    fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.effective_model().to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Builds the configured backend. `Ok(None)` means AI phrasing is disabled.
pub fn build_llm_client(config: &LlmConfig) -> Result<Option<Arc<dyn LlmClient>>, CompletionError> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|error| CompletionError::Transport(error.to_string()))?;
    let generation = Generation::from_config(config);

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Disabled => return Ok(None),
        LlmProvider::OpenAi => Arc::new(OpenAiClient {
            http,
            api_key: required_key(config)?,
            base_url: base_url(config, OPENAI_BASE_URL),
            generation,
        }),
        LlmProvider::Anthropic => Arc::new(AnthropicClient {
            http,
            api_key: required_key(config)?,
            base_url: base_url(config, ANTHROPIC_BASE_URL),
            generation,
        }),
        LlmProvider::Ollama => {
            let base_url = config
                .base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
                .ok_or_else(|| {
                    CompletionError::Unconfigured("ollama requires llm.base_url".to_string())
                })?;
            Arc::new(OllamaClient { http, base_url, generation })
        }
    };

    Ok(Some(client))
}

fn required_key(config: &LlmConfig) -> Result<SecretString, CompletionError> {
    config.api_key.clone().ok_or_else(|| {
        CompletionError::Unconfigured(format!("{} requires llm.api_key", config.provider.as_str()))
    })
}

fn base_url(config: &LlmConfig, default: &str) -> String {
    config.base_url.as_deref().unwrap_or(default).trim_end_matches('/').to_string()
}

fn chat_role(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::Customer => "user",
        Speaker::Assistant => "assistant",
    }
}

/// History plus the new utterance as role/content pairs.
fn chat_messages(request: &CompletionRequest) -> Vec<Value> {
    request
        .history
        .iter()
        .map(|turn| json!({ "role": chat_role(turn.speaker), "content": turn.text }))
        .chain(std::iter::once(json!({ "role": "user", "content": request.user_utterance })))
        .collect()
}

fn non_empty(text: Option<String>) -> Result<String, CompletionError> {
    text.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(CompletionError::EmptyResponse)
}

async fn send_json(
    builder: reqwest::RequestBuilder,
    body: &Value,
    timeout: Duration,
) -> Result<reqwest::Response, CompletionError> {
    let response = builder.timeout(timeout).json(body).send().await.map_err(|error| {
        if error.is_timeout() {
            CompletionError::Timeout(timeout)
        } else {
            CompletionError::from(error)
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CompletionError::Status { status: status.as_u16(), body });
    }
    Ok(response)
}

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    generation: Generation,
}

impl OpenAiClient {
    fn body(&self, request: &CompletionRequest) -> Value {
        let mut messages = vec![json!({ "role": "system", "content": request.system_prompt })];
        messages.extend(chat_messages(request));
        json!({
            "model": self.generation.model,
            "messages": messages,
            "max_tokens": self.generation.max_tokens,
            "temperature": self.generation.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let response = send_json(
            self.http
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(self.api_key.expose_secret()),
            &self.body(request),
            request.timeout,
        )
        .await?;

        let parsed: ApiResponse = response.json().await?;
        non_empty(parsed.choices.into_iter().next().and_then(|choice| choice.message.content))
    }

    fn model_name(&self) -> &str {
        &self.generation.model
    }
}

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    generation: Generation,
}

impl AnthropicClient {
    fn body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.generation.model,
            "system": request.system_prompt,
            "messages": chat_messages(request),
            "max_tokens": self.generation.max_tokens,
            "temperature": self.generation.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            kind: String,
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            content: Vec<ContentBlock>,
        }

        let response = send_json(
            self.http
                .post(format!("{}/messages", self.base_url))
                .header("x-api-key", self.api_key.expose_secret())
                .header("anthropic-version", ANTHROPIC_VERSION),
            &self.body(request),
            request.timeout,
        )
        .await?;

        let parsed: ApiResponse = response.json().await?;
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        non_empty(Some(text))
    }

    fn model_name(&self) -> &str {
        &self.generation.model
    }
}

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    generation: Generation,
}

impl OllamaClient {
    fn body(&self, request: &CompletionRequest) -> Value {
        let mut messages = vec![json!({ "role": "system", "content": request.system_prompt })];
        messages.extend(chat_messages(request));
        json!({
            "model": self.generation.model,
            "messages": messages,
            "stream": false,
            "options": {
                "num_predict": self.generation.max_tokens,
                "temperature": self.generation.temperature,
            },
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            message: Option<Message>,
        }

        let response = send_json(
            self.http.post(format!("{}/api/chat", self.base_url)),
            &self.body(request),
            request.timeout,
        )
        .await?;

        let parsed: ApiResponse = response.json().await?;
        non_empty(parsed.message.and_then(|message| message.content))
    }

    fn model_name(&self) -> &str {
        &self.generation.model
    }
}
