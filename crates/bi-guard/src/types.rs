//! Core types for the BI guard pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Kinds of personally identifiable information the detector knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    /// Email addresses
    Emails,
    /// Phone numbers (permissive)
    Phones,
    /// Luhn-valid payment card numbers
    CreditCards,
    /// US social security numbers
    Ssn,
    /// IBAN-like bank account identifiers
    Iban,
}

impl PiiCategory {
    /// Every category, in reporting order
    pub const ALL: [PiiCategory; 5] = [
        PiiCategory::Emails,
        PiiCategory::Phones,
        PiiCategory::CreditCards,
        PiiCategory::Ssn,
        PiiCategory::Iban,
    ];

    /// Stable key used in details and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            PiiCategory::Emails => "emails",
            PiiCategory::Phones => "phones",
            PiiCategory::CreditCards => "credit_cards",
            PiiCategory::Ssn => "ssn",
            PiiCategory::Iban => "iban",
        }
    }
}

impl std::fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matched raw strings per category. Categories without matches are absent.
pub type PiiMatches = BTreeMap<PiiCategory, Vec<String>>;

/// Outcome of validating a user query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationVerdict {
    /// Query accepted; holds the whitespace-normalized text
    Accepted(String),
    /// Query rejected
    Rejected(Rejection),
}

impl ValidationVerdict {
    /// Whether the query may proceed
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationVerdict::Accepted(_))
    }

    /// The sanitized query, present only when accepted
    pub fn sanitized_text(&self) -> Option<&str> {
        match self {
            ValidationVerdict::Accepted(text) => Some(text),
            ValidationVerdict::Rejected(_) => None,
        }
    }

    /// The display-safe rejection message, present only when rejected
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ValidationVerdict::Accepted(_) => None,
            ValidationVerdict::Rejected(rejection) => Some(&rejection.message),
        }
    }

    /// The full rejection, present only when rejected
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ValidationVerdict::Accepted(_) => None,
            ValidationVerdict::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Why a query was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Which check refused the query
    pub kind: RejectionKind,
    /// Human-readable message, safe to display
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Checks that can refuse a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionKind {
    /// Payload was not text
    NotText,
    /// Nothing left after trimming
    Empty,
    /// Below the minimum length
    TooShort,
    /// Above the maximum length
    TooLong,
    /// Matched a prompt/command injection pattern
    Suspicious,
    /// Looked like a shell file read
    FileAccess,
    /// Refused by the external guard backend
    Backend,
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionKind::NotText => write!(f, "Not Text"),
            RejectionKind::Empty => write!(f, "Empty"),
            RejectionKind::TooShort => write!(f, "Too Short"),
            RejectionKind::TooLong => write!(f, "Too Long"),
            RejectionKind::Suspicious => write!(f, "Suspicious"),
            RejectionKind::FileAccess => write!(f, "File Access"),
            RejectionKind::Backend => write!(f, "Backend"),
        }
    }
}

/// Result of sanitizing an agent or tool response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizationResult {
    /// False iff any PII was found
    pub is_safe: bool,
    /// Text with every PII span replaced by the placeholder
    pub sanitized_text: String,
    /// What was found
    pub details: DetailRecord,
}

/// Findings attached to an output sanitization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    /// Raw matches per PII category
    pub pii: PiiMatches,
    /// Advisory flag: assertive claim without a cited source
    pub hallucination_flag: bool,
    /// Explanatory notes, in the order they were raised
    pub notes: Vec<String>,
    /// Tool whose output was redacted, set only on the tool path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl DetailRecord {
    /// Whether any PII category matched
    pub fn has_pii(&self) -> bool {
        !self.pii.is_empty()
    }
}

/// Direction of content flow through the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// User query on its way to the agent
    Input,
    /// Final agent answer on its way to the user
    Output,
    /// Tool result on its way back into the reasoning loop
    ToolOutput,
}

/// Which validator produced a decision. Only ever reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handler {
    /// External guard backend
    Backend,
    /// Local heuristic validators
    Local,
}

/// Request context for guard operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardContext {
    /// Unique request ID
    pub request_id: Uuid,
    /// User identifier (optional)
    pub user_id: Option<String>,
    /// Session identifier (optional)
    pub session_id: Option<String>,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Default for GuardContext {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: None,
            session_id: None,
            timestamp: Utc::now(),
        }
    }
}

impl GuardContext {
    /// Create a new context with a fresh request ID
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user ID
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session ID
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Request context
    pub context: GuardContext,
    /// Direction of the content
    pub direction: Direction,
    /// Tool name on the tool path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Original content hash
    pub content_hash: String,
    /// What the guard decided
    pub outcome: AuditOutcome,
    /// Who decided it
    pub handler: Handler,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Decision recorded in the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    /// Content passed unchanged (or only whitespace-normalized)
    Passed,
    /// Content was redacted
    Redacted { categories: Vec<PiiCategory> },
    /// Content was blocked
    Blocked { kind: RejectionKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_accessors() {
        let accepted = ValidationVerdict::Accepted("List projects".to_string());
        assert!(accepted.is_accepted());
        assert_eq!(accepted.sanitized_text(), Some("List projects"));
        assert_eq!(accepted.rejection_reason(), None);

        let rejected =
            ValidationVerdict::Rejected(Rejection::new(RejectionKind::Empty, "Empty query"));
        assert!(!rejected.is_accepted());
        assert_eq!(rejected.sanitized_text(), None);
        assert_eq!(rejected.rejection_reason(), Some("Empty query"));
    }

    #[test]
    fn test_pii_category_keys() {
        let keys: Vec<&str> = PiiCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(keys, vec!["emails", "phones", "credit_cards", "ssn", "iban"]);

        let json = serde_json::to_string(&PiiCategory::CreditCards).unwrap();
        assert_eq!(json, "\"credit_cards\"");
    }

    #[test]
    fn test_detail_record_serializes_pii_by_key() {
        let mut details = DetailRecord::default();
        details
            .pii
            .insert(PiiCategory::Emails, vec!["a@b.io".to_string()]);

        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["pii"]["emails"][0], "a@b.io");
        assert_eq!(value["hallucination_flag"], false);
        assert!(value.get("tool").is_none());
    }

    #[test]
    fn test_context_builder() {
        let ctx = GuardContext::new()
            .with_user_id("analyst-7")
            .with_session_id("s-1");
        assert_eq!(ctx.user_id.as_deref(), Some("analyst-7"));
        assert_eq!(ctx.session_id.as_deref(), Some("s-1"));
        assert_ne!(ctx.request_id, GuardContext::new().request_id);
    }
}
