//! Configuration for the BI guard pipeline
//!
//! Every section has working defaults, so an empty TOML document is a valid
//! configuration. Selected values can be overridden from the environment.

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`BackendConfig::endpoint`] (also enables the backend)
pub const ENV_BACKEND_URL: &str = "BI_GUARD_BACKEND_URL";
/// Environment variable overriding [`BackendConfig::api_key`]
pub const ENV_BACKEND_API_KEY: &str = "BI_GUARD_BACKEND_API_KEY";
/// Environment variable overriding [`BackendConfig::timeout_ms`]
pub const ENV_BACKEND_TIMEOUT_MS: &str = "BI_GUARD_BACKEND_TIMEOUT_MS";
/// Environment variable overriding [`InputConfig::max_length`]
pub const ENV_MAX_INPUT_LENGTH: &str = "BI_GUARD_MAX_INPUT_LENGTH";

/// Main configuration for Guard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Input validation
    pub input: InputConfig,
    /// PII detection and redaction
    pub pii: PiiConfig,
    /// Output validation
    pub output: OutputConfig,
    /// External guard backend
    pub backend: BackendConfig,
    /// Audit logging
    pub audit: AuditConfig,
    /// Log subscriber setup
    pub logging: LoggingConfig,
}

impl GuardConfig {
    /// Local heuristics only, no backend and no audit trail
    pub fn local_only() -> Self {
        Self {
            backend: BackendConfig {
                enabled: false,
                ..Default::default()
            },
            audit: AuditConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: GuardConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using a custom variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend.enabled = true;
            self.backend.endpoint = Some(url.trim().to_string());
        }
        if let Some(key) = lookup(ENV_BACKEND_API_KEY).filter(|v| !v.is_empty()) {
            self.backend.api_key = Some(key);
        }
        if let Some(raw) = lookup(ENV_BACKEND_TIMEOUT_MS) {
            self.backend.timeout_ms = parse_env_number(ENV_BACKEND_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_INPUT_LENGTH) {
            self.input.max_length = parse_env_number(ENV_MAX_INPUT_LENGTH, &raw)?;
        }
        self.validate()
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.input.min_length == 0 {
            return Err(GuardError::ConfigError(
                "input.min_length must be at least 1".to_string(),
            ));
        }
        if self.input.min_length > self.input.max_length {
            return Err(GuardError::ConfigError(format!(
                "input.min_length ({}) exceeds input.max_length ({})",
                self.input.min_length, self.input.max_length
            )));
        }
        for pattern in &self.input.custom_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                GuardError::ConfigError(format!("invalid custom pattern {:?}: {}", pattern, e))
            })?;
        }
        if self.pii.placeholder.is_empty() {
            return Err(GuardError::ConfigError(
                "pii.placeholder must not be empty".to_string(),
            ));
        }
        if self.backend.enabled && self.backend.endpoint.is_none() {
            return Err(GuardError::ConfigError(
                "backend.enabled requires backend.endpoint".to_string(),
            ));
        }
        if self.backend.timeout_ms == 0 {
            return Err(GuardError::ConfigError(
                "backend.timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| GuardError::ConfigError(format!("{} is not a number: {:?}", key, raw)))
}

/// Input validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Minimum query length in characters, after trimming
    pub min_length: usize,
    /// Maximum query length in characters, after trimming
    pub max_length: usize,
    /// Extra case-insensitive injection regexes
    pub custom_patterns: Vec<String>,
    /// Reject shell file reads such as `cat /etc/passwd`
    pub block_file_access: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 3000,
            custom_patterns: vec![],
            block_file_access: true,
        }
    }
}

/// PII detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PiiConfig {
    /// Enable PII detection
    pub enabled: bool,
    /// Detect email addresses
    pub detect_emails: bool,
    /// Detect phone numbers
    pub detect_phones: bool,
    /// Detect Luhn-valid card numbers
    pub detect_credit_cards: bool,
    /// Detect SSNs
    pub detect_ssn: bool,
    /// Detect IBAN-like identifiers
    pub detect_iban: bool,
    /// Replacement text for every redacted span
    pub placeholder: String,
}

impl Default for PiiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detect_emails: true,
            detect_phones: true,
            detect_credit_cards: true,
            detect_ssn: true,
            detect_iban: true,
            placeholder: crate::pii::DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

/// Output validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Annotate assertive claims that cite no source
    pub flag_unsupported_claims: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            flag_unsupported_claims: true,
        }
    }
}

/// External guard backend configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Try the backend before the local validators
    pub enabled: bool,
    /// Backend URL
    pub endpoint: Option<String>,
    /// Bearer token
    pub api_key: Option<String>,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: false, // Disabled by default as it requires a service
            endpoint: None,
            api_key: None,
            timeout_ms: 5000,
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit logging
    pub enabled: bool,
    /// Log (truncated) content instead of just hashes
    pub log_content: bool,
    /// Append JSON lines to this file
    pub log_file: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_content: false, // Privacy by default
            log_file: None,
        }
    }
}

/// Log subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
