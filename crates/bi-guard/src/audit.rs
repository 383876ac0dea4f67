//! Audit logging for Guard decisions

use crate::config::AuditConfig;
use crate::types::{AuditEntry, AuditOutcome, Direction, GuardContext, Handler};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;

use tracing::{info, warn};

/// Audit logger
#[derive(Debug, Clone)]
pub struct AuditLogger {
    config: AuditConfig,
}

/// One decision to record
pub struct AuditEvent<'a> {
    pub context: &'a GuardContext,
    pub direction: Direction,
    pub tool: Option<&'a str>,
    pub content: &'a str,
    pub outcome: AuditOutcome,
    pub handler: Handler,
    pub duration_ms: u64,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Log a guard decision
    pub fn log(&self, event: AuditEvent<'_>) {
        if !self.config.enabled {
            return;
        }

        let entry = AuditEntry {
            context: event.context.clone(),
            direction: event.direction,
            tool: event.tool.map(str::to_string),
            content_hash: hash_content(event.content),
            outcome: event.outcome,
            handler: event.handler,
            processing_time_ms: event.duration_ms,
        };

        self.emit(&entry, event.content);
    }

    /// Emit an audit entry
    fn emit(&self, entry: &AuditEntry, content: &str) {
        let content_field = if self.config.log_content {
            Some(truncate(content, 500))
        } else {
            None
        };

        info!(
            request_id = %entry.context.request_id,
            user_id = ?entry.context.user_id,
            session_id = ?entry.context.session_id,
            direction = ?entry.direction,
            tool = ?entry.tool,
            content_hash = %entry.content_hash,
            outcome = ?entry.outcome,
            handler = ?entry.handler,
            processing_time_ms = entry.processing_time_ms,
            content = ?content_field,
            "Guard audit"
        );

        if let Some(ref path) = self.config.log_file {
            if let Err(e) = append_json_line(path, entry) {
                warn!(path = %path, error = %e, "Failed to write audit file");
            }
        }
    }
}

fn append_json_line(path: &str, entry: &AuditEntry) -> std::io::Result<()> {
    let json = serde_json::to_string(entry)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{json}")
}

/// Hash content for audit (privacy-preserving)
fn hash_content(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Truncate string for logging, on a character boundary
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}
