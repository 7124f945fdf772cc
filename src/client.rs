use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::cache::PromptCache;
use crate::error::{GatewayError, TutorialError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 15_000;

/// The supported LLM providers, closed at compile time.
///
/// Selection happens once at configuration time; there is no string-keyed
/// dispatch at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    GoogleGemini,
    AnthropicClaude,
    OpenAiGpt,
}

impl ProviderKind {
    /// The wire name accepted in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::GoogleGemini => "google-gemini",
            ProviderKind::AnthropicClaude => "anthropic-claude",
            ProviderKind::OpenAiGpt => "openai-gpt",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderKind::GoogleGemini => "GEMINI_API_KEY",
            ProviderKind::AnthropicClaude => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAiGpt => "OPENAI_API_KEY",
        }
    }

    /// Environment variable overriding this provider's model name.
    pub fn model_var(&self) -> &'static str {
        match self {
            ProviderKind::GoogleGemini => "GEMINI_MODEL",
            ProviderKind::AnthropicClaude => "ANTHROPIC_MODEL",
            ProviderKind::OpenAiGpt => "OPENAI_MODEL",
        }
    }

    /// Model used when no override is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::GoogleGemini => "gemini-2.5-pro-exp-03-25",
            ProviderKind::AnthropicClaude => "claude-3-7-sonnet-20250219",
            ProviderKind::OpenAiGpt => "o4-mini",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TutorialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google-gemini" => Ok(ProviderKind::GoogleGemini),
            "anthropic-claude" => Ok(ProviderKind::AnthropicClaude),
            "openai-gpt" => Ok(ProviderKind::OpenAiGpt),
            other => Err(TutorialError::InvalidConfig(format!(
                "unknown provider '{other}' (expected google-gemini, anthropic-claude or openai-gpt)"
            ))),
        }
    }
}

/// Connection settings for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: String,
    /// Base URL, overridable for self-hosted gateways and tests.
    pub endpoint: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Build a config for `kind` from the conventional environment variables.
    ///
    /// A missing or empty API key surfaces as an auth failure before any
    /// request is dispatched.
    pub fn from_env(kind: ProviderKind) -> Result<Self, GatewayError> {
        let api_key = std::env::var(kind.api_key_var()).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(GatewayError::Auth { provider: kind });
        }
        let model =
            std::env::var(kind.model_var()).unwrap_or_else(|_| kind.default_model().to_string());
        Ok(Self {
            kind,
            model,
            api_key,
            endpoint: default_endpoint(kind).to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn default_endpoint(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::GoogleGemini => "https://generativelanguage.googleapis.com",
        ProviderKind::AnthropicClaude => "https://api.anthropic.com",
        ProviderKind::OpenAiGpt => "https://api.openai.com",
    }
}

/// The provider seam: turn a prompt into plain response text.
///
/// Implementations must be idempotent per prompt — the retry driver may call
/// `complete` again with the same input after a transient failure.
pub trait CompletionBackend: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
}

/// HTTP backend dispatching to the configured provider and normalizing each
/// provider's response shape into plain text.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: ProviderConfig,
}

impl HttpBackend {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    pub fn provider(&self) -> ProviderKind {
        self.config.kind
    }

    async fn dispatch(&self, prompt: &str) -> Result<String, GatewayError> {
        let provider = self.config.kind;
        let (request, extract): (_, fn(&Value) -> Option<String>) = match provider {
            ProviderKind::GoogleGemini => {
                let url = format!(
                    "{}/v1beta/models/{}:generateContent?key={}",
                    self.config.endpoint, self.config.model, self.config.api_key
                );
                let body = json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                });
                (self.client.post(&url).json(&body), extract_gemini_text)
            }
            ProviderKind::AnthropicClaude => {
                let url = format!("{}/v1/messages", self.config.endpoint);
                let body = json!({
                    "model": self.config.model,
                    "max_tokens": ANTHROPIC_MAX_TOKENS,
                    "messages": [{ "role": "user", "content": prompt }],
                });
                (
                    self.client
                        .post(&url)
                        .header("x-api-key", &self.config.api_key)
                        .header("anthropic-version", ANTHROPIC_VERSION)
                        .json(&body),
                    extract_anthropic_text,
                )
            }
            ProviderKind::OpenAiGpt => {
                let url = format!("{}/v1/chat/completions", self.config.endpoint);
                let body = json!({
                    "model": self.config.model,
                    "messages": [{ "role": "user", "content": prompt }],
                });
                (
                    self.client.post(&url).bearer_auth(&self.config.api_key).json(&body),
                    extract_openai_text,
                )
            }
        };

        let resp = request
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable {
                provider,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GatewayError::Auth { provider });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = resp.json().await.map_err(|e| GatewayError::MalformedResponse {
            provider,
            message: e.to_string(),
        })?;

        extract(&payload).ok_or_else(|| GatewayError::MalformedResponse {
            provider,
            message: "response carried no text content".to_string(),
        })
    }
}

impl CompletionBackend for HttpBackend {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send {
        self.dispatch(prompt)
    }
}

fn extract_gemini_text(payload: &Value) -> Option<String> {
    payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

/// Anthropic responses interleave thinking and text blocks; the answer is the
/// last block of type "text".
fn extract_anthropic_text(payload: &Value) -> Option<String> {
    payload
        .get("content")?
        .as_array()?
        .iter()
        .rev()
        .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

fn extract_openai_text(payload: &Value) -> Option<String> {
    payload
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

/// Append-only audit log of every prompt/response pair.
///
/// Write failures are logged and swallowed — auditing must never block a
/// model call.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    path: Option<PathBuf>,
}

impl CallLog {
    /// A log that records into `path`, one dated PROMPT/RESPONSE pair per call.
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }

    /// A log writing `llm_calls_<date>.log` under `dir`, creating the
    /// directory if needed. Falls back to a disabled log if the directory
    /// cannot be created — auditing never blocks the pipeline.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "cannot create audit log directory, disabling audit log");
            return Self::disabled();
        }
        let file = format!("llm_calls_{}.log", chrono::Local::now().format("%Y%m%d"));
        Self {
            path: Some(dir.join(file)),
        }
    }

    /// A disabled log.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    fn record(&self, label: &str, text: &str) {
        let Some(path) = &self.path else { return };
        let line = format!(
            "{} - {}: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            label,
            text
        );
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "audit log write failed");
        }
    }
}

/// The single synchronous call surface in front of every model request.
///
/// Consults the prompt cache first (exact match), records every invocation in
/// the audit log, and merges new responses back into the cache. The gateway
/// performs no retries — transient failures propagate to the pipeline's
/// retry driver.
#[derive(Debug)]
pub struct LlmGateway<B> {
    backend: B,
    cache: PromptCache,
    log: CallLog,
}

impl<B: CompletionBackend> LlmGateway<B> {
    pub fn new(backend: B, cache: PromptCache, log: CallLog) -> Self {
        Self { backend, cache, log }
    }

    pub fn cache(&self) -> &PromptCache {
        &self.cache
    }

    /// Resolve `prompt` to response text, via the cache when permitted.
    pub async fn invoke(&self, prompt: &str, use_cache: bool) -> Result<String, GatewayError> {
        self.log.record("PROMPT", prompt);

        if use_cache {
            if let Some(hit) = self.cache.get(prompt) {
                debug!(prompt_len = prompt.len(), "prompt cache hit");
                self.log.record("RESPONSE", &hit);
                return Ok(hit);
            }
        }

        let response = self.backend.complete(prompt).await?;
        self.log.record("RESPONSE", &response);
        info!(
            prompt_len = prompt.len(),
            response_len = response.len(),
            "model call completed"
        );

        if use_cache {
            if let Err(e) = self.cache.insert(prompt, &response) {
                warn!(error = %e, "failed to persist prompt cache entry");
            }
        }

        Ok(response)
    }
}
