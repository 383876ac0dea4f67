//! # BI Guard
//!
//! Input/output safety layer for the business-intelligence assistant.
//!
//! The guard sits between the untrusted user, the tool layer and the language
//! model:
//!
//! - **Input validation**: length bounds, prompt/command injection patterns,
//!   shell file-read attempts, whitespace normalization
//! - **PII redaction**: emails, phones, Luhn-checked card numbers, SSNs, IBANs
//! - **Unsupported claims**: advisory flag for assertions without a cited source
//! - **Backend fallback**: an optional external guard service is tried first;
//!   any failure falls back to the local validators
//! - **Metrics and audit**: monotonic counters and a structured audit trail
//!
//! ## Quick Start
//!
//! ```rust
//! use bi_guard::{Guard, GuardConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let guard = Guard::new(GuardConfig::local_only());
//!
//!     // Before reasoning
//!     match guard.validate_input("List all consultants with Python").await {
//!         Ok(query) => println!("Query: {}", query),
//!         Err(rejection) => println!("Rejected: {}", rejection),
//!     }
//!
//!     // Inside a tool, before the result reaches the model
//!     let (text, _details) = guard
//!         .validate_tool_output("read_lines", "Contact: ana@example.com")
//!         .await;
//!     assert_eq!(text, "Contact: [REDACTED]");
//!
//!     // Before answering the user
//!     let answer = guard.validate_output("See PROJ001 for details").await;
//!     println!("{}", answer);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!  user query ──► Guard::validate_input ──► orchestrator / tools
//!                                                   │
//!  tool result ◄── Guard::validate_tool_output ◄────┤
//!                                                   │
//!  answer ◄─────── Guard::validate_output ◄─────────┘
//!
//!  each call: external backend ──(any failure)──► local validator
//!             Input Validator · Output Validator · PII Detector
//!             GuardMetrics · AuditLogger
//! ```

pub mod audit;
pub mod backend;
pub mod config;
pub mod error;
pub mod guard;
pub mod injection;
pub mod input;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod pii;
pub mod types;

pub use backend::{BackendVerdict, GuardBackend};
pub use config::GuardConfig;
pub use error::{BackendError, GuardError, Result};
pub use guard::{Guard, GuardBuilder};
pub use metrics::{GuardMetrics, MetricsSnapshot};
pub use types::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::{BackendVerdict, GuardBackend};
    pub use crate::config::GuardConfig;
    pub use crate::error::{BackendError, GuardError, Result};
    pub use crate::guard::{Guard, GuardBuilder};
    pub use crate::metrics::{GuardMetrics, MetricsSnapshot};
    pub use crate::types::*;
}
