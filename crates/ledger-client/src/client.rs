//! Ledger HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use ledger_core::{AccountId, CreditPack, Metadata};

use crate::error::ClientError;
use crate::types::{
    AnalyzeRequest, AnalyzeResponse, ApiErrorResponse, BalanceResponse, ConsumeRequest,
    ConsumeResponse, PacksResponse, TransactionPage,
};

/// Credit ledger API client.
///
/// Service calls authenticate with the API key given at construction; user
/// calls take the caller's bearer token per request.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl LedgerClient {
    /// Create a new ledger client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the ledger service (e.g., `"http://ledger:8080"`)
    /// * `api_key` - Service API key for authentication
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new ledger client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base URL is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            service_name: options.service_name,
        })
    }

    /// Charge an account on behalf of this service.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientCredits`] when the balance does not
    /// cover `amount`, or another error if the request fails.
    pub async fn consume(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: impl Into<String>,
        metadata: Metadata,
    ) -> Result<ConsumeResponse, ClientError> {
        let url = format!("{}/v1/usage/consume", self.base_url);
        let request = ConsumeRequest {
            account_id: account_id.to_string(),
            amount,
            reason: reason.into(),
            metadata,
        };

        tracing::debug!(account_id = %account_id, amount, "Consuming credits");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the caller's current balance (requires user JWT, not service API key).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_balance(&self, user_jwt: &str) -> Result<BalanceResponse, ClientError> {
        let url = format!("{}/v1/credits/balance", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {user_jwt}"))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List the caller's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_transactions(
        &self,
        user_jwt: &str,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionPage, ClientError> {
        let url = format!("{}/v1/credits/transactions", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit), ("offset", offset)])
            .header("authorization", format!("Bearer {user_jwt}"))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Run a priced analysis for the caller.
    ///
    /// The service charges only when the analysis succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientCredits`] if the analysis was refused,
    /// [`ClientError::ConsumeFailed`] if it ran but could not be charged.
    pub async fn analyze(
        &self,
        user_jwt: &str,
        kind: &str,
        input: &serde_json::Value,
    ) -> Result<AnalyzeResponse, ClientError> {
        let url = format!("{}/v1/analyses", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {user_jwt}"))
            .json(&AnalyzeRequest { kind, input })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List the purchasable credit packs.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_packs(&self) -> Result<Vec<CreditPack>, ClientError> {
        let url = format!("{}/v1/credits/packs", self.base_url);

        let response = self.client.get(&url).send().await?;

        let body: PacksResponse = self.handle_response(response).await?;
        Ok(body.packs)
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let body = api_error.error;

                match body.code.as_str() {
                    "insufficient_credits" => Err(ClientError::InsufficientCredits {
                        balance: body.detail_i64("balance"),
                        required: body.detail_i64("required"),
                    }),
                    "consume_failed" => Err(ClientError::ConsumeFailed {
                        invocation_id: body.detail_str("invocation_id").unwrap_or_default(),
                    }),
                    "not_found" if body.message.starts_with("account not found") => {
                        Err(ClientError::AccountNotFound {
                            account_id: body.message.replace("account not found: ", ""),
                        })
                    }
                    _ => Err(ClientError::Api {
                        code: body.code,
                        message: body.message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name recorded as the source of consumed credits.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = LedgerClient::new("http://localhost:8080", "test-api-key").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = LedgerClient::new("http://localhost:8080/", "test-api-key").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = LedgerClient::new("/", "key").unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn client_options() {
        let options = ClientOptions::with_service_name("chat");
        let client = LedgerClient::with_options("http://localhost:8080", "key", options).unwrap();
        assert_eq!(client.service_name, "chat");
    }
}
