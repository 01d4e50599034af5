//! OpenAI-compatible provider implementation.
//!
//! The default backend is Gemini through its OpenAI-compatible endpoint;
//! OpenAI, OpenRouter, Ollama and vLLM speak the same protocol. The
//! [`Dialect`] captures where Gemini differs on the wire.
//!
//! Supports:
//! - Chat completions (non-streaming)
//! - Embeddings
//! - Reachability checks for `ragcall doctor`

use async_trait::async_trait;
use ragcall_core::error::ProviderError;
use ragcall_core::message::{Message, Role};
use ragcall_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Gemini's OpenAI-compatible endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Seconds to wait after a 429 that carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Wire differences between OpenAI-compatible backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Google's endpoint: model ids may carry a `models/` prefix, and error
    /// bodies are sometimes wrapped in a JSON array.
    Gemini,
    OpenAi,
}

impl Dialect {
    pub fn detect(base_url: &str) -> Self {
        if base_url.contains("generativelanguage.googleapis.com") {
            Dialect::Gemini
        } else {
            Dialect::OpenAi
        }
    }

    /// Model id as this backend expects it in a request.
    fn request_model<'a>(&self, model: &'a str) -> &'a str {
        match self {
            Dialect::Gemini => model.strip_prefix("models/").unwrap_or(model),
            Dialect::OpenAi => model,
        }
    }

    /// Model id as reported back to callers, without backend decoration.
    fn reported_model(&self, model: String) -> String {
        match self {
            Dialect::Gemini => match model.strip_prefix("models/") {
                Some(bare) => bare.to_string(),
                None => model,
            },
            Dialect::OpenAi => model,
        }
    }
}

/// Pull a readable message out of an error body.
///
/// Handles `{"error": {"message": ...}}` and Gemini's
/// `[{"error": {"message": ...}}]`; anything else is returned as is.
fn error_message(body: &str) -> String {
    let parsed: Option<ApiErrorBody> = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .or_else(|| {
            serde_json::from_str::<Vec<ApiErrorBody>>(body)
                .ok()
                .and_then(|v| v.into_iter().next())
        });
    match parsed {
        Some(b) => b.error.message,
        None => body.trim().to_string(),
    }
}

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    dialect: Dialect,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            name: name.into(),
            dialect: Dialect::detect(&base_url),
            base_url,
            api_key: api_key.into(),
            client,
        }
    }

    /// Gemini through its OpenAI-compatible endpoint.
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::new("gemini", GEMINI_BASE_URL, api_key)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                },
                content: Some(m.content.clone()),
            })
            .collect()
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
    }

    /// Map non-success HTTP statuses to provider errors.
    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> std::result::Result<reqwest::Response, ProviderError> {
        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(response),
            429 => {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                Err(ProviderError::RateLimited { retry_after_secs })
            }
            401 | 403 => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::AuthenticationFailed(error_message(&body)))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = error_message(&body);
                warn!(provider = %self.name, status, error = %message, "Provider returned error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message,
                })
            }
        }
    }

    fn network_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }

    fn parse_error(what: &str, e: reqwest::Error) -> ProviderError {
        ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse {what} response: {e}"),
        }
    }
}

#[async_trait]
impl ragcall_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut body = serde_json::json!({
            "model": self.dialect.request_model(&request.model),
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .post("chat/completions", &body)
            .send()
            .await
            .map_err(Self::network_error)?;
        let response = self.check_status(response).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Self::parse_error("completion", e))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        Ok(ProviderResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage: api_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: self
                .dialect
                .reported_model(api_response.model.unwrap_or(request.model)),
        })
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let body = serde_json::json!({
            "model": self.dialect.request_model(&request.model),
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .post("embeddings", &body)
            .send()
            .await
            .map_err(Self::network_error)?;
        let response = self.check_status(response).await?;

        let api_resp: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| Self::parse_error("embedding", e))?;

        let usage = api_resp.usage.as_ref().map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: 0,
            total_tokens: u.total_tokens,
        });

        Ok(EmbeddingResponse {
            embeddings: api_resp.into_ordered_embeddings(),
            model: self.dialect.reported_model(request.model),
            usage,
        })
    }

    /// Lists models with the configured key; a rejected key is an error.
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::network_error)?;
        self.check_status(response).await?;
        Ok(true)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<EmbeddingApiUsage>,
}

impl EmbeddingApiResponse {
    /// Embeddings in input order (the API reports an index per item).
    fn into_ordered_embeddings(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}
