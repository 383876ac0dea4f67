//! Guard facade: the single entry point for the orchestrator and the tools

use crate::audit::{AuditEvent, AuditLogger};
use crate::backend::{BackendVerdict, GuardBackend};
use crate::config::GuardConfig;
use crate::error::{BackendError, GuardError, Result};
use crate::input::InputValidator;
use crate::metrics::GuardMetrics;
use crate::output::OutputValidator;
use crate::types::{
    AuditOutcome, DetailRecord, Direction, GuardContext, Handler, PiiCategory, Rejection,
    RejectionKind, ValidationVerdict,
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{error::Elapsed, timeout};
use tracing::warn;

/// What a backend call produced: a panic, a timeout, or the backend's own answer
type BackendOutcome<T> =
    std::thread::Result<std::result::Result<std::result::Result<T, BackendError>, Elapsed>>;

/// Main Guard struct
///
/// Every query, tool result and final answer goes through here. When a
/// backend is configured it is asked first; if it fails in any way the call
/// is handled by the local validators instead. Callers cannot tell which one
/// answered except from the logs.
pub struct Guard {
    input: InputValidator,
    output: OutputValidator,
    backend: Option<Arc<dyn GuardBackend>>,
    backend_timeout: Duration,
    metrics: Arc<GuardMetrics>,
    audit: AuditLogger,
}

impl Default for Guard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

impl Guard {
    /// Create a new Guard with the given configuration
    pub fn new(config: GuardConfig) -> Self {
        GuardBuilder::new().with_config(config).build()
    }

    /// Create a builder for Guard
    pub fn builder() -> GuardBuilder {
        GuardBuilder::new()
    }

    /// Counters this guard reports to
    pub fn metrics(&self) -> &Arc<GuardMetrics> {
        &self.metrics
    }

    /// Validate a user query; the error carries a message safe to display
    pub async fn validate_input(&self, text: &str) -> Result<String> {
        self.validate_input_with_context(text, &GuardContext::default())
            .await
    }

    /// Validate a user query that arrived as untyped JSON
    pub async fn validate_input_value(&self, raw: &serde_json::Value) -> Result<String> {
        match raw.as_str() {
            Some(text) => self.validate_input(text).await,
            None => {
                let ctx = GuardContext::default();
                let verdict = self.input.validate_value(raw);
                self.settle_input(verdict, &ctx, "", Handler::Local, Instant::now())
            }
        }
    }

    /// Validate a user query with context
    pub async fn validate_input_with_context(
        &self,
        text: &str,
        context: &GuardContext,
    ) -> Result<String> {
        let start = Instant::now();

        let (verdict, handler) = match self.backend_input(text).await {
            Some(BackendVerdict::Pass(sanitized)) => {
                (ValidationVerdict::Accepted(sanitized), Handler::Backend)
            }
            Some(BackendVerdict::Reject(reason)) => (
                ValidationVerdict::Rejected(Rejection::new(RejectionKind::Backend, reason)),
                Handler::Backend,
            ),
            None => (self.input.validate(text), Handler::Local),
        };

        self.settle_input(verdict, context, text, handler, start)
    }

    fn settle_input(
        &self,
        verdict: ValidationVerdict,
        context: &GuardContext,
        content: &str,
        handler: Handler,
        start: Instant,
    ) -> Result<String> {
        let (outcome, result) = match verdict {
            ValidationVerdict::Accepted(sanitized) => (AuditOutcome::Passed, Ok(sanitized)),
            ValidationVerdict::Rejected(rejection) => {
                self.metrics.record_input_blocked();
                (
                    AuditOutcome::Blocked {
                        kind: rejection.kind,
                    },
                    Err(GuardError::InputRejected(rejection)),
                )
            }
        };

        self.audit.log(AuditEvent {
            context,
            direction: Direction::Input,
            tool: None,
            content,
            outcome,
            handler,
            duration_ms: start.elapsed().as_millis() as u64,
        });

        result
    }

    /// Sanitize the final answer before it reaches the user. Never fails.
    pub async fn validate_output(&self, text: &str) -> String {
        self.validate_output_with_context(text, &GuardContext::default())
            .await
    }

    /// Sanitize the final answer with context
    pub async fn validate_output_with_context(&self, text: &str, context: &GuardContext) -> String {
        let start = Instant::now();

        let (sanitized, categories, handler) = match self.backend_output(text).await {
            Some(sanitized) => (sanitized, vec![], Handler::Backend),
            None => {
                let result = self.output.validate_and_sanitize(text);
                let categories = result.details.pii.keys().copied().collect();
                (result.sanitized_text, categories, Handler::Local)
            }
        };

        let changed = sanitized != text;
        if changed {
            self.metrics.record_output_redacted();
        }

        self.audit.log(AuditEvent {
            context,
            direction: Direction::Output,
            tool: None,
            content: text,
            outcome: outcome_for(changed, categories),
            handler,
            duration_ms: start.elapsed().as_millis() as u64,
        });

        sanitized
    }

    /// Sanitize a tool result before it goes back into the reasoning loop
    pub async fn validate_tool_output(
        &self,
        tool_name: &str,
        text: &str,
    ) -> (String, DetailRecord) {
        self.validate_tool_output_with_context(tool_name, text, &GuardContext::default())
            .await
    }

    /// Sanitize a tool result with context
    pub async fn validate_tool_output_with_context(
        &self,
        tool_name: &str,
        text: &str,
        context: &GuardContext,
    ) -> (String, DetailRecord) {
        let start = Instant::now();

        let (sanitized, details, handler) = match self.backend_output(text).await {
            Some(sanitized) => {
                let mut details = DetailRecord::default();
                if sanitized != text {
                    details.tool = Some(tool_name.to_string());
                    details
                        .notes
                        .push(format!("Tool '{}' output redacted for PII", tool_name));
                }
                (sanitized, details, Handler::Backend)
            }
            None => {
                let (sanitized, details) = self.output.redact_tool_output(tool_name, text);
                (sanitized, details, Handler::Local)
            }
        };

        let changed = sanitized != text;
        if changed {
            self.metrics.record_tool_redacted();
        }

        self.audit.log(AuditEvent {
            context,
            direction: Direction::ToolOutput,
            tool: Some(tool_name),
            content: text,
            outcome: outcome_for(changed, details.pii.keys().copied().collect()),
            handler,
            duration_ms: start.elapsed().as_millis() as u64,
        });

        (sanitized, details)
    }

    /// Injection check only, for monitoring; touches no counters
    pub fn is_suspicious(&self, text: &str) -> bool {
        self.input.is_suspicious(text)
    }

    async fn backend_input(&self, text: &str) -> Option<BackendVerdict> {
        let backend = self.backend.as_deref()?;
        let call = timeout(self.backend_timeout, backend.validate_input(text));
        let result = AssertUnwindSafe(call).catch_unwind().await;
        self.settle_backend(backend, Direction::Input, result)
    }

    async fn backend_output(&self, text: &str) -> Option<String> {
        let backend = self.backend.as_deref()?;
        let call = timeout(self.backend_timeout, backend.validate_output(text));
        let result = AssertUnwindSafe(call).catch_unwind().await;
        self.settle_backend(backend, Direction::Output, result)
    }

    /// Every failure means the same thing: use the local validators for this call
    fn settle_backend<T>(
        &self,
        backend: &dyn GuardBackend,
        direction: Direction,
        result: BackendOutcome<T>,
    ) -> Option<T> {
        let error = match result {
            Ok(Ok(Ok(value))) => return Some(value),
            Ok(Ok(Err(e))) => e,
            Ok(Err(_)) => BackendError::Timeout(self.backend_timeout),
            Err(payload) => BackendError::Panicked(panic_message(payload.as_ref())),
        };
        warn!(
            backend = backend.name(),
            direction = ?direction,
            error = %error,
            "Guard backend unavailable, falling back to local validators"
        );
        None
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn outcome_for(changed: bool, categories: Vec<PiiCategory>) -> AuditOutcome {
    if changed {
        AuditOutcome::Redacted { categories }
    } else {
        AuditOutcome::Passed
    }
}

/// Builder for Guard
pub struct GuardBuilder {
    config: GuardConfig,
    backend: Option<Arc<dyn GuardBackend>>,
    metrics: Option<Arc<GuardMetrics>>,
}

impl GuardBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: GuardConfig::default(),
            backend: None,
            metrics: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure input validation
    pub fn with_input(mut self, config: crate::config::InputConfig) -> Self {
        self.config.input = config;
        self
    }

    /// Configure PII detection
    pub fn with_pii(mut self, config: crate::config::PiiConfig) -> Self {
        self.config.pii = config;
        self
    }

    /// Configure output validation
    pub fn with_output(mut self, config: crate::config::OutputConfig) -> Self {
        self.config.output = config;
        self
    }

    /// Configure audit logging
    pub fn with_audit(mut self, config: crate::config::AuditConfig) -> Self {
        self.config.audit = config;
        self
    }

    /// Use this backend instead of the one described by the configuration
    pub fn with_backend(mut self, backend: Arc<dyn GuardBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Per-call budget for the backend
    pub fn with_backend_timeout(mut self, limit: Duration) -> Self {
        self.config.backend.timeout_ms = limit.as_millis().max(1) as u64;
        self
    }

    /// Report to this registry instead of the process-wide one
    pub fn with_metrics(mut self, metrics: Arc<GuardMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the Guard
    pub fn build(self) -> Guard {
        let backend = self.backend.or_else(|| configured_backend(&self.config));

        Guard {
            input: InputValidator::new(self.config.input.clone()),
            output: OutputValidator::new(self.config.pii.clone(), self.config.output.clone()),
            backend,
            backend_timeout: Duration::from_millis(self.config.backend.timeout_ms.max(1)),
            metrics: self.metrics.unwrap_or_else(GuardMetrics::global),
            audit: AuditLogger::new(self.config.audit.clone()),
        }
    }
}

impl Default for GuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http-backend")]
fn configured_backend(config: &GuardConfig) -> Option<Arc<dyn GuardBackend>> {
    if !config.backend.enabled {
        return None;
    }
    match crate::backend::HttpGuardBackend::new(&config.backend) {
        Ok(backend) => Some(Arc::new(backend)),
        Err(e) => {
            warn!(error = %e, "Guard backend could not be created, using local validators only");
            None
        }
    }
}

#[cfg(not(feature = "http-backend"))]
fn configured_backend(config: &GuardConfig) -> Option<Arc<dyn GuardBackend>> {
    if config.backend.enabled {
        warn!("Guard backend configured but http-backend feature is disabled");
    }
    None
}
