//! OpenRouter chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::types::{
    AnalysisReport, AnalysisRequest, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};
use super::{AnalysisError, Analyzer};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default primary model.
pub const DEFAULT_PRIMARY_MODEL: &str = "anthropic/claude-3-haiku";

/// Default fallback model.
pub const DEFAULT_FALLBACK_MODEL: &str = "meta-llama/llama-3.1-8b-instruct:free";

/// Timeout of a single completion call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest an analysis can take: the primary call plus one fallback call.
pub const MAX_ANALYSIS_DURATION: Duration = Duration::from_secs(2 * REQUEST_TIMEOUT.as_secs());

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 2000;

/// Statuses after which the fallback model is tried.
fn should_fall_back(status: StatusCode) -> bool {
    matches!(status.as_u16(), 400 | 402 | 403 | 429 | 503)
}

/// Analyzer backed by the OpenRouter API.
#[derive(Debug, Clone)]
pub struct OpenRouterAnalyzer {
    client: Client,
    base_url: String,
    api_key: String,
    primary_model: String,
    fallback_model: String,
}

impl OpenRouterAnalyzer {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        primary_model: impl Into<String>,
        fallback_model: impl Into<String>,
    ) -> Result<Self, AnalysisError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            primary_model: primary_model.into(),
            fallback_model: fallback_model.into(),
        })
    }

    async fn complete(
        &self,
        model: &str,
        request: &AnalysisRequest,
    ) -> Result<reqwest::Response, AnalysisError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: request.prompt(),
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", format!("Altiscap - {} analysis", request.kind))
            .json(&body)
            .send()
            .await?;

        tracing::debug!(model, status = %response.status(), "Inference response received");
        Ok(response)
    }

    async fn into_report(
        response: reqwest::Response,
        request: &AnalysisRequest,
        model: &str,
        fallback_used: bool,
    ) -> Result<AnalysisReport, AnalysisError> {
        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AnalysisError::InvalidResponse("no choices returned".into()))?;

        Ok(AnalysisReport {
            kind: request.kind,
            model: model.to_string(),
            fallback_used,
            result: parse_content(&content),
        })
    }
}

/// Parse the model output as JSON, tolerating a surrounding code fence.
fn parse_content(content: &str) -> serde_json::Value {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced).unwrap_or_else(|_| {
        tracing::warn!("Model output is not JSON, returning raw text");
        serde_json::json!({ "text": trimmed })
    })
}

async fn api_error(response: reqwest::Response) -> AnalysisError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    AnalysisError::Api { status, message }
}

#[async_trait]
impl Analyzer for OpenRouterAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        let response = self.complete(&self.primary_model, request).await?;
        if response.status().is_success() {
            return Self::into_report(response, request, &self.primary_model, false).await;
        }

        let status = response.status();
        if !should_fall_back(status) {
            return Err(api_error(response).await);
        }

        tracing::warn!(
            status = %status,
            primary = %self.primary_model,
            fallback = %self.fallback_model,
            "Primary model unavailable, trying fallback"
        );
        let fallback = self.complete(&self.fallback_model, request).await?;
        if fallback.status().is_success() {
            return Self::into_report(fallback, request, &self.fallback_model, true).await;
        }
        Err(api_error(fallback).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_statuses() {
        for code in [400, 402, 403, 429, 503] {
            assert!(should_fall_back(StatusCode::from_u16(code).unwrap()));
        }
        for code in [401, 404, 500, 502] {
            assert!(!should_fall_back(StatusCode::from_u16(code).unwrap()));
        }
    }

    #[test]
    fn parses_fenced_json() {
        let value = parse_content("```json\n{\"score\": 80}\n```");
        assert_eq!(value["score"], 80);
    }

    #[test]
    fn wraps_plain_text() {
        let value = parse_content("The business looks healthy.");
        assert_eq!(value["text"], "The business looks healthy.");
    }
}
