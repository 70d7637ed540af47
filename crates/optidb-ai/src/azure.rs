//! Azure OpenAI chat-completions augmenter

use crate::prompt::{SYSTEM_PROMPT, build_prompt};
use crate::response::parse_recommendations;
use async_trait::async_trait;
use optidb_core::{
    AugmentError, AugmentResult, IndexInfo, ProviderMetadata, QueryStats, Recommendation,
    RecommendationAugmenter, TableInfo,
};
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const ENV_DEPLOYMENT: &str = "AZURE_OPENAI_CHAT_DEPLOYMENT_NAME";

/// Connection and sampling settings for an Azure OpenAI deployment
#[derive(Clone, PartialEq)]
pub struct AzureOpenAiConfig {
    pub api_key: String,
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    pub api_version: String,
    /// Chat deployment name
    pub deployment: String,
    /// Whole-request timeout
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl fmt::Debug for AzureOpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl AzureOpenAiConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_MAX_TOKENS: u32 = 2000;
    pub const DEFAULT_TEMPERATURE: f32 = 0.1;

    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            api_version: api_version.into(),
            deployment: deployment.into(),
            timeout: Self::DEFAULT_TIMEOUT,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: Self::DEFAULT_TEMPERATURE,
        }
    }

    /// Reads the four `AZURE_OPENAI_*` variables; `None` if any is missing or empty
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`] with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Some(Self::new(
            var(ENV_API_KEY)?,
            var(ENV_ENDPOINT)?,
            var(ENV_API_VERSION)?,
            var(ENV_DEPLOYMENT)?,
        ))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Full chat-completions URL for the configured deployment
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

/// Augmenter backed by an Azure OpenAI chat deployment.
///
/// One request per call, bounded by the configured timeout and never retried.
pub struct AzureOpenAiAugmenter {
    config: AzureOpenAiConfig,
    client: Client,
    cancel_token: Mutex<CancellationToken>,
}

impl fmt::Debug for AzureOpenAiAugmenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAiAugmenter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AzureOpenAiAugmenter {
    /// Creates the augmenter and its HTTP client
    pub fn new(config: AzureOpenAiConfig) -> AugmentResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AugmentError::ProviderUnavailable(format!("HTTP client: {e}")))?;

        tracing::info!(
            endpoint = %config.endpoint,
            deployment = %config.deployment,
            "initialized Azure OpenAI augmenter"
        );

        Ok(Self {
            config,
            client,
            cancel_token: Mutex::new(CancellationToken::new()),
        })
    }

    /// Builds an augmenter from the environment, if fully configured
    pub fn from_env() -> Option<AugmentResult<Self>> {
        AzureOpenAiConfig::from_env().map(Self::new)
    }

    pub fn config(&self) -> &AzureOpenAiConfig {
        &self.config
    }

    /// Token for the next request; a token cancelled by an earlier call is replaced
    fn fresh_token(&self) -> CancellationToken {
        let mut token = self.cancel_token.lock();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        token.clone()
    }

    async fn complete(&self, prompt: String) -> AugmentResult<String> {
        let url = self.config.chat_completions_url();
        let request = ChatRequest {
            messages: vec![
                ChatMessage::new("system", SYSTEM_PROMPT),
                ChatMessage::new("user", prompt),
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        tracing::debug!(url = %url, "sending request to Azure OpenAI");

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                return Err(AugmentError::Authentication(
                    "Invalid Azure OpenAI API key".to_string(),
                ));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(AugmentError::RateLimited("Rate limit exceeded".to_string()));
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(AugmentError::InvalidResponse(format!(
                    "Status {status}: {body}"
                )));
            }
            _ => {}
        }

        let response: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AugmentError::Timeout
            } else {
                AugmentError::InvalidResponse(e.to_string())
            }
        })?;

        if let Some(usage) = &response.usage {
            tracing::debug!(total_tokens = usage.total_tokens, "Azure OpenAI call succeeded");
        }

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AugmentError::InvalidResponse("No choices in response".to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> AugmentError {
    if e.is_timeout() {
        AugmentError::Timeout
    } else {
        AugmentError::Network(e.to_string())
    }
}

#[async_trait]
impl RecommendationAugmenter for AzureOpenAiAugmenter {
    async fn generate_recommendations(
        &self,
        query: &QueryStats,
        tables: &[TableInfo],
        indexes: &[IndexInfo],
    ) -> AugmentResult<Vec<Recommendation>> {
        if !self.is_available() {
            return Err(AugmentError::ProviderUnavailable(
                "Azure OpenAI API key is not set".to_string(),
            ));
        }

        tracing::info!(
            calls = query.calls,
            mean_exec_time_ms = query.mean_exec_time,
            "requesting AI recommendations"
        );

        let token = self.fresh_token();
        let prompt = build_prompt(query, tables, indexes)?;

        let content = tokio::select! {
            _ = token.cancelled() => return Err(AugmentError::Cancelled),
            result = self.complete(prompt) => result?,
        };

        let recommendations = parse_recommendations(&content)?;
        tracing::info!(
            recommendations = recommendations.len(),
            "received AI recommendations"
        );
        Ok(recommendations)
    }

    fn cancel(&self) {
        self.cancel_token.lock().cancel();
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new("Azure OpenAI", &self.config.deployment)
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}
