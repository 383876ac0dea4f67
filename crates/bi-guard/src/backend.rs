//! External guard backend seam
//!
//! A backend is an optional service that validates text before the local
//! heuristics get a say. It is allowed to be missing, slow or broken: the
//! facade falls back to the local validators whenever a call fails.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the backend decided about a user query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendVerdict {
    /// Query may proceed, possibly rewritten by the backend
    Pass(String),
    /// Query refused; the reason is shown to the user
    Reject(String),
}

/// Capability interface of an external guard service
#[async_trait]
pub trait GuardBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Validate a user query
    async fn validate_input(&self, text: &str) -> Result<BackendVerdict, BackendError>;

    /// Sanitize an agent answer or tool result
    async fn validate_output(&self, text: &str) -> Result<String, BackendError>;
}

/// Request body sent to the guard service
#[derive(Debug, Serialize)]
struct GuardRequest<'a> {
    direction: &'static str,
    text: &'a str,
}

/// Response body from the guard service
#[derive(Debug, Deserialize)]
struct GuardResponse {
    allowed: bool,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

const DEFAULT_BACKEND_REJECTION: &str = "Your query was rejected by the content policy.";

fn interpret_input(response: GuardResponse, original: &str) -> BackendVerdict {
    if response.allowed {
        BackendVerdict::Pass(response.text.unwrap_or_else(|| original.to_string()))
    } else {
        BackendVerdict::Reject(
            response
                .reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BACKEND_REJECTION.to_string()),
        )
    }
}

fn interpret_output(response: GuardResponse) -> Result<String, BackendError> {
    match response.text {
        Some(text) => Ok(text),
        None if response.allowed => Err(BackendError::Malformed(
            "allowed output without text".to_string(),
        )),
        None => Err(BackendError::Malformed(format!(
            "output refused without replacement text: {}",
            response.reason.unwrap_or_default()
        ))),
    }
}

#[cfg(feature = "http-backend")]
pub use http::HttpGuardBackend;

#[cfg(feature = "http-backend")]
mod http {
    use super::*;
    use crate::config::BackendConfig;
    use std::time::Duration;

    /// Guard service reached over HTTP with JSON bodies
    pub struct HttpGuardBackend {
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
    }

    impl HttpGuardBackend {
        /// Create a backend from configuration
        pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| {
                    BackendError::Transport("no backend endpoint configured".to_string())
                })?;
            let client = reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()?;

            Ok(Self {
                client,
                endpoint,
                api_key: config.api_key.clone(),
            })
        }

        async fn call(
            &self,
            direction: &'static str,
            text: &str,
        ) -> Result<GuardResponse, BackendError> {
            let mut req = self
                .client
                .post(&self.endpoint)
                .json(&GuardRequest { direction, text });

            if let Some(ref api_key) = self.api_key {
                req = req.bearer_auth(api_key);
            }

            let response = req
                .send()
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?;

            if !response.status().is_success() {
                return Err(BackendError::Status(response.status().as_u16()));
            }

            response
                .json::<GuardResponse>()
                .await
                .map_err(|e| BackendError::Malformed(e.to_string()))
        }
    }

    #[async_trait]
    impl GuardBackend for HttpGuardBackend {
        fn name(&self) -> &str {
            "http"
        }

        async fn validate_input(&self, text: &str) -> Result<BackendVerdict, BackendError> {
            let response = self.call("input", text).await?;
            Ok(interpret_input(response, text))
        }

        async fn validate_output(&self, text: &str) -> Result<String, BackendError> {
            let response = self.call("output", text).await?;
            interpret_output(response)
        }
    }
}
