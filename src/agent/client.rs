//! Chat completions API client (OpenAI-compatible)

use crate::agent::types::*;
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use backoff::ExponentialBackoffBuilder;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chat completions API client
#[derive(Clone)]
pub struct OpenAiClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: ProviderConfig,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();

        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!(
                "Bearer {}",
                config.api_key.expose_secret()
            ))
            .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OpenAiClient { client, config })
    }

    /// Get the configured model
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Create a chat completion without tools
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        response_format: Option<ResponseFormat>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            tools: None,
            tool_choice: None,
            response_format,
        };

        self.send_request(request).await
    }

    /// Create a chat completion with tools/functions
    pub async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        response_format: Option<ResponseFormat>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            tools: Some(tools),
            tool_choice: Some("auto".to_string()),
            response_format,
        };

        self.send_request(request).await
    }

    /// Send a request, retrying transient failures with exponential backoff
    async fn send_request(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let attempts = AtomicU32::new(0);
        let max_retries = self.config.max_retries;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(None)
            .build();

        backoff::future::retry(policy, || {
            let request = request.clone();
            let attempts = &attempts;
            async move {
                match self.send_once(request).await {
                    Ok(response) => Ok(response),
                    Err(e) if e.is_retryable() => {
                        let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
                        if attempt > max_retries {
                            Err(backoff::Error::permanent(e))
                        } else {
                            warn!("Provider call failed (attempt {}), retrying: {}", attempt, e);
                            Err(backoff::Error::transient(e))
                        }
                    }
                    Err(e) => Err(backoff::Error::permanent(e)),
                }
            }
        })
        .await
    }

    /// Send a single request to the chat completions API
    async fn send_once(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        debug!("Sending request to provider: model={}", request.model);

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.json::<ChatCompletionResponse>().await?;

            if let Some(ref usage) = body.usage {
                info!(
                    "Provider response: model={}, tokens={}",
                    body.model, usage.total_tokens
                );
            }

            Ok(body)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            match status.as_u16() {
                429 => Err(Error::RateLimit(error_text)),
                401 => Err(Error::Unauthorized("Invalid API key".to_string())),
                500..=599 => Err(Error::ProviderUnavailable(format!(
                    "{}: {}",
                    status, error_text
                ))),
                _ => Err(Error::Provider(format!(
                    "API error ({}): {}",
                    status, error_text
                ))),
            }
        }
    }

    /// List available models (used by the status command)
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.config.base_url);

        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            let body: ModelsResponse = response.json().await?;
            Ok(body.data)
        } else {
            let error = response.text().await.unwrap_or_default();
            Err(Error::Provider(format!("Failed to list models: {}", error)))
        }
    }
}

/// Response from /models endpoint
#[derive(Debug, serde::Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

/// Information about an available model
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ModelInfo {
    /// Model ID (e.g., "gpt-4o")
    pub id: String,
}
