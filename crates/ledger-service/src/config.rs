//! Service configuration.

use std::str::FromStr;

use ledger_core::{default_packs, CreditPack, DEFAULT_ANALYSIS_COST, DEFAULT_INITIAL_CREDITS};

use crate::inference::client::{
    DEFAULT_BASE_URL, DEFAULT_FALLBACK_MODEL, DEFAULT_PRIMARY_MODEL, MAX_ANALYSIS_DURATION,
};
use crate::ledger::InitPolicy;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection string. When unset the service runs on the
    /// in-memory store.
    pub database_url: Option<String>,

    /// `RocksDB` data directory (used with the `rocksdb-backend` feature when
    /// no database URL is set).
    pub data_dir: Option<String>,

    /// HS256 secret shared with the identity provider.
    pub jwt_secret: Option<String>,

    /// Expected JWT audience (default: "ledger").
    pub auth_audience: String,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Admin API key.
    pub admin_api_key: Option<String>,

    /// Credits granted on initialization.
    pub initial_credits: i64,

    /// Initialize unseen accounts on first use.
    pub auto_initialize: bool,

    /// Cost of one analysis.
    pub analysis_cost: i64,

    /// Inference provider API key (analyses are disabled without it).
    pub openrouter_api_key: Option<String>,

    /// Inference provider base URL.
    pub openrouter_url: String,

    /// Primary model.
    pub primary_model: String,

    /// Model tried when the primary is unavailable.
    pub fallback_model: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Timeout for `/v1/analyses` in seconds. Covers the primary and
    /// fallback inference calls plus the charge.
    pub analysis_timeout_seconds: u64,

    /// Credit pack catalog.
    pub packs: Vec<CreditPack>,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: env_or("LISTEN_ADDR", defaults.listen_addr),
            database_url: env_opt("DATABASE_URL"),
            data_dir: env_opt("DATA_DIR"),
            jwt_secret: env_opt("JWT_SECRET"),
            auth_audience: env_or("AUTH_AUDIENCE", defaults.auth_audience),
            service_api_key: env_opt("SERVICE_API_KEY"),
            admin_api_key: env_opt("ADMIN_API_KEY"),
            initial_credits: env_parse("INITIAL_CREDITS", defaults.initial_credits),
            auto_initialize: env_opt("AUTO_INITIALIZE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.auto_initialize),
            analysis_cost: env_parse("ANALYSIS_COST", defaults.analysis_cost),
            openrouter_api_key: env_opt("OPENROUTER_API_KEY"),
            openrouter_url: env_or("OPENROUTER_URL", defaults.openrouter_url),
            primary_model: env_or("PRIMARY_MODEL", defaults.primary_model),
            fallback_model: env_or("FALLBACK_MODEL", defaults.fallback_model),
            cors_origins: env_opt("CORS_ORIGINS").map_or(defaults.cors_origins, |s| {
                s.split(',').map(|s| s.trim().to_string()).collect()
            }),
            max_body_bytes: env_parse("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_parse(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            analysis_timeout_seconds: env_parse(
                "ANALYSIS_TIMEOUT_SECONDS",
                defaults.analysis_timeout_seconds,
            ),
            packs: defaults.packs,
        }
        .validated()
    }

    /// Replace settings the ledger would reject at request time with their
    /// defaults, logging each replacement.
    #[must_use]
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.analysis_cost <= 0 {
            tracing::warn!(
                value = self.analysis_cost,
                default = defaults.analysis_cost,
                "ANALYSIS_COST must be positive, using default"
            );
            self.analysis_cost = defaults.analysis_cost;
        }
        if self.initial_credits < 0 {
            tracing::warn!(
                value = self.initial_credits,
                default = defaults.initial_credits,
                "INITIAL_CREDITS must not be negative, using default"
            );
            self.initial_credits = defaults.initial_credits;
        }
        if self.analysis_timeout_seconds <= MAX_ANALYSIS_DURATION.as_secs() {
            tracing::warn!(
                value = self.analysis_timeout_seconds,
                inference_seconds = MAX_ANALYSIS_DURATION.as_secs(),
                "ANALYSIS_TIMEOUT_SECONDS may cancel analyses before inference finishes"
            );
        }
        self
    }

    /// The auto-initialization policy these settings describe.
    #[must_use]
    pub const fn init_policy(&self) -> InitPolicy {
        if self.auto_initialize {
            InitPolicy::OnFirstUse {
                credits: self.initial_credits,
            }
        } else {
            InitPolicy::Explicit
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            data_dir: None,
            jwt_secret: None,
            auth_audience: "ledger".into(),
            service_api_key: None,
            admin_api_key: None,
            initial_credits: DEFAULT_INITIAL_CREDITS,
            auto_initialize: true,
            analysis_cost: DEFAULT_ANALYSIS_COST,
            openrouter_api_key: None,
            openrouter_url: DEFAULT_BASE_URL.into(),
            primary_model: DEFAULT_PRIMARY_MODEL.into(),
            fallback_model: DEFAULT_FALLBACK_MODEL.into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            analysis_timeout_seconds: MAX_ANALYSIS_DURATION.as_secs() + 30,
            packs: default_packs(),
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: String) -> String {
    env_opt(name).unwrap_or(default)
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env_opt(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
