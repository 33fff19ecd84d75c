//! Text-formatting assistant: prompt building and completion backends.
//!
//! The pipeline only ever talks to [`CompletionService`]. Two backends are
//! provided:
//!
//! * [`OpenRouterClient`] — a plain chat-completions client over `reqwest`,
//!   carrying the `HTTP-Referer` / `X-Title` attribution headers OpenRouter
//!   uses to identify the calling application.
//! * [`ProviderCompletion`] — an adapter over any `edgequake_llm` provider
//!   (OpenAI, Anthropic, Gemini, Ollama, …).
//!
//! ## Failure contract
//!
//! [`format_with_assistant`] returns `None` on *any* failure. Callers treat
//! `None` as "assistant unavailable" and apply their own fallback; a
//! completion failure is never fatal and is never retried.

use crate::config::OpenRouterConfig;
use crate::error::{CompletionError, ConvertError};
use crate::prompts::{conversion_prompt, CONVERSION_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Character budget for PDF text sent in a single conversion request.
pub const PDF_CHAR_BUDGET: usize = 10_000;
/// Character budget for serialized HTML sent in a single conversion request.
pub const HTML_CHAR_BUDGET: usize = 10_000;
/// Window size for one enhancement request.
pub const MARKDOWN_CHAR_BUDGET: usize = 8_000;

/// Source-format label that selects the prompt and truncation budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Html,
    Markdown,
}

impl SourceFormat {
    /// Maximum number of characters of content per request.
    pub fn char_budget(&self) -> usize {
        match self {
            SourceFormat::Pdf => PDF_CHAR_BUDGET,
            SourceFormat::Html => HTML_CHAR_BUDGET,
            SourceFormat::Markdown => MARKDOWN_CHAR_BUDGET,
        }
    }
}

/// A chat-style text-completion backend.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one system + user exchange and return the assistant's text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "completion-service"
    }
}

/// Convert `content` to Markdown through the assistant.
///
/// Truncates to the format's budget, builds the format-specific prompt and
/// submits it. Returns `None` when the service fails or answers with
/// nothing but whitespace.
pub async fn format_with_assistant(
    service: &dyn CompletionService,
    content: &str,
    source: SourceFormat,
) -> Option<String> {
    let budget = source.char_budget();
    let truncated = truncate_chars(content, budget);
    if truncated.len() < content.len() {
        info!(
            "Truncated {:?} content to {} chars for {}",
            source,
            budget,
            service.name()
        );
    }

    let prompt = conversion_prompt(source, truncated);
    complete_or_none(service, CONVERSION_SYSTEM_PROMPT, &prompt).await
}

/// Run a single completion, logging and swallowing any failure.
pub async fn complete_or_none(
    service: &dyn CompletionService,
    system: &str,
    user: &str,
) -> Option<String> {
    let start = Instant::now();
    match service.complete(system, user).await {
        Ok(text) if !text.trim().is_empty() => {
            debug!(
                "{}: {} chars in / {} chars out, {:?}",
                service.name(),
                user.len(),
                text.len(),
                start.elapsed()
            );
            Some(text)
        }
        Ok(_) => {
            warn!("{}: {}", service.name(), CompletionError::EmptyResponse);
            None
        }
        Err(e) => {
            warn!("{}: {} — falling back", service.name(), e);
            None
        }
    }
}

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── OpenRouter backend ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenRouter (or any OpenAI-compatible URL).
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: OpenRouterConfig,
}

impl fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("config", &self.config)
            .finish()
    }
}

impl OpenRouterClient {
    /// Build a client with its own connection pool and timeout.
    pub fn new(config: OpenRouterConfig) -> Result<Self, ConvertError> {
        if config.api_key.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "OpenRouter API key must not be empty".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConvertError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionService for OpenRouterClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                RequestMessage {
                    role: "system",
                    content: system,
                },
                RequestMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", self.config.site_url.as_str())
            .header("X-Title", self.config.site_name.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(CompletionError::from_status(status.as_u16(), body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::Api {
                status: status.as_u16(),
                detail: format!("unparseable response: {e}"),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}

// ── edgequake-llm backend ────────────────────────────────────────────────

/// Adapter exposing an `edgequake_llm` provider as a [`CompletionService`].
pub struct ProviderCompletion {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: f32,
    max_tokens: usize,
}

impl fmt::Debug for ProviderCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCompletion")
            .field("provider", &self.label)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderCompletion {
    /// Wrap a pre-built provider.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
            temperature: 0.1,
            max_tokens: 4096,
        }
    }

    /// Instantiate a named provider (API key read by the provider factory).
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, ConvertError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            ConvertError::InvalidConfig(format!(
                "LLM provider '{provider_name}' is not configured: {e}"
            ))
        })?;
        Ok(Self::new(provider, provider_name))
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }
}

#[async_trait]
impl CompletionService for ProviderCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| CompletionError::Provider(e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(response.content)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted completion services shared by unit tests.

    use super::*;
    use std::sync::Mutex;

    /// Always fails, as if the network were down.
    pub struct Unreachable;

    #[async_trait]
    impl CompletionService for Unreachable {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Network("connection refused".into()))
        }
    }

    /// Replies with a fixed transformation of the user prompt and records
    /// every prompt it receives.
    pub struct Scripted {
        pub reply: Box<dyn Fn(&str) -> Result<String, CompletionError> + Send + Sync>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        pub fn new(
            reply: impl Fn(&str) -> Result<String, CompletionError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                reply: Box::new(reply),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for Scripted {
        async fn complete(&self, _system: &str, user: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(user.to_string());
            (self.reply)(user)
        }
    }
}
