//! DVM configuration

use crate::orchestrator::OrchestratorSettings;
use nostr::{Keypair, Nip01Error, is_job_request_kind};
use nostr_client::{DEFAULT_RELAYS, PoolConfig, RelayConfig, SubscriptionBuilder, parse_relay_url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the hex secret key.
pub const SECRET_KEY_ENV: &str = "DVM_SECRET_KEY";

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("no secret key: set DVM_SECRET_KEY or secret_key_file")]
    MissingSecretKey,

    #[error("invalid secret key: {0}")]
    InvalidSecretKey(#[from] Nip01Error),
}

/// Text generation backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Ollama base url
    pub endpoint: String,
    /// Model used when the request does not name one
    pub model: String,
    /// Upper bound on one generation call
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_secs: 120,
        }
    }
}

/// DVM configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DvmConfig {
    /// Nostr relays to connect to
    pub relays: Vec<String>,
    /// Job request kinds served
    pub request_kinds: Vec<u16>,
    /// How far back the subscription reaches on (re)connect
    pub lookback_secs: u64,
    /// Subscription limit
    pub limit: u64,
    /// Only take requests that `p`-tag this service
    pub only_tagged: bool,
    pub reconnect_delay_secs: u64,
    pub connect_timeout_secs: u64,
    /// Publish a `processing` status before generating
    pub send_processing_feedback: bool,
    /// Bound on remembered event ids (unbounded when unset)
    pub dedup_capacity: Option<usize>,
    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// File holding the hex secret key
    pub secret_key_file: Option<PathBuf>,
    pub generation: GenerationConfig,
}

impl Default for DvmConfig {
    fn default() -> Self {
        Self {
            relays: DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect(),
            request_kinds: vec![nostr::KIND_JOB_TEXT_GENERATION],
            lookback_secs: 300,
            limit: 50,
            only_tagged: false,
            reconnect_delay_secs: 5,
            connect_timeout_secs: 10,
            send_processing_feedback: false,
            dedup_capacity: None,
            log_filter: "info".to_string(),
            secret_key_file: None,
            generation: GenerationConfig::default(),
        }
    }
}

impl DvmConfig {
    /// Load config from `path`, or from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("dvm").join("config.toml"))
    }

    /// Replace the relay list
    pub fn with_relays(mut self, relays: Vec<String>) -> Self {
        self.relays = relays;
        self
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relays.is_empty() {
            return Err(ConfigError::Invalid("no relays configured".to_string()));
        }
        for relay in &self.relays {
            parse_relay_url(relay)
                .map_err(|e| ConfigError::Invalid(format!("relay {relay}: {e}")))?;
        }

        if self.request_kinds.is_empty() {
            return Err(ConfigError::Invalid("request_kinds is empty".to_string()));
        }
        if let Some(kind) = self.request_kinds.iter().find(|k| !is_job_request_kind(**k)) {
            return Err(ConfigError::Invalid(format!(
                "kind {kind} is not a job request kind (5000-5999)"
            )));
        }

        if self.dedup_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "dedup_capacity must be positive".to_string(),
            ));
        }

        let endpoint = &self.generation.endpoint;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "generation.endpoint must be an http(s) url: {endpoint}"
            )));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "generation.timeout_secs must be positive".to_string(),
            ));
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::Invalid("generation.model is empty".to_string()));
        }

        Ok(())
    }

    /// Load the service key from `DVM_SECRET_KEY`, falling back to `secret_key_file`.
    pub fn load_secret_key(&self) -> Result<Keypair, ConfigError> {
        self.secret_key_from(std::env::var(SECRET_KEY_ENV).ok())
    }

    fn secret_key_from(&self, env: Option<String>) -> Result<Keypair, ConfigError> {
        if let Some(hex) = env.filter(|v| !v.trim().is_empty()) {
            return Ok(Keypair::from_secret_hex(&hex)?);
        }

        let path = self
            .secret_key_file
            .as_ref()
            .ok_or(ConfigError::MissingSecretKey)?;
        let hex = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Keypair::from_secret_hex(&hex)?)
    }

    /// Relay pool settings for a service with this `pubkey`, at time `now`.
    pub fn pool_config(&self, pubkey: &str, now: i64) -> PoolConfig {
        let lookback = i64::try_from(self.lookback_secs).unwrap_or(i64::MAX);
        let since = now.saturating_sub(lookback).max(0);
        let tagged = self.only_tagged.then(|| pubkey.to_string());

        PoolConfig {
            relays: self.relays.clone(),
            filters: SubscriptionBuilder::new()
                .dvm_requests(self.request_kinds.clone(), since, self.limit, tagged)
                .build(),
            relay: RelayConfig {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            },
            dedup_capacity: self.dedup_capacity,
        }
    }

    /// Job handling settings.
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            request_kinds: self.request_kinds.clone(),
            model: self.generation.model.clone(),
            generation_timeout: Duration::from_secs(self.generation.timeout_secs),
            send_processing_feedback: self.send_processing_feedback,
        }
    }
}
