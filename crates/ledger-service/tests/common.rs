//! Common test utilities for ledger service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use ledger_core::AccountId;
use ledger_service::inference::{AnalysisError, AnalysisReport, AnalysisRequest, Analyzer};
use ledger_service::{create_router, AppState, ServiceConfig};
use ledger_store::MemoryStore;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const SERVICE_API_KEY: &str = "test-service-key";
pub const ADMIN_API_KEY: &str = "test-admin-key";

/// Analyzer that answers from memory and counts its invocations.
#[derive(Default)]
pub struct StubAnalyzer {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubAnalyzer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AnalysisError::Api {
                status: 503,
                message: "overloaded".into(),
            });
        }
        Ok(AnalysisReport {
            kind: request.kind,
            model: "stub/model".into(),
            fallback_used: false,
            result: json!({ "score": 85, "input": request.input }),
        })
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// A test account for authenticated requests.
    pub test_account_id: AccountId,
    /// The analyzer wired into the service.
    pub analyzer: Arc<StubAnalyzer>,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory store.
    pub fn new() -> Self {
        Self::with(ServiceConfig::default(), StubAnalyzer::default())
    }

    /// Create a harness with custom settings and analyzer.
    pub fn with(config: ServiceConfig, analyzer: StubAnalyzer) -> Self {
        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: Some(JWT_SECRET.into()),
            service_api_key: Some(SERVICE_API_KEY.into()),
            admin_api_key: Some(ADMIN_API_KEY.into()),
            openrouter_api_key: None,
            ..config
        };

        let analyzer = Arc::new(analyzer);
        let state = AppState::new(Arc::new(MemoryStore::new()), config)
            .with_analyzer(Arc::clone(&analyzer) as Arc<dyn Analyzer>);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            test_account_id: AccountId::generate(),
            analyzer,
        }
    }

    /// Get the authorization header for the test account.
    pub fn user_auth_header(&self) -> String {
        Self::auth_header_for(&self.test_account_id)
    }

    /// Get an authorization header for any account.
    pub fn auth_header_for(account_id: &AccountId) -> String {
        format!("Bearer {}", mint_token(&account_id.to_string(), "ledger"))
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        Self::auth_header_for(&AccountId::generate())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Mint an HS256 token the service accepts.
pub fn mint_token(subject: &str, audience: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    encode(
        &Header::default(),
        &json!({ "sub": subject, "aud": audience, "exp": exp }),
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to mint token")
}
