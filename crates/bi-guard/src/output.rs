//! Validation of agent answers and tool results before they are shown or fed back

use crate::config::{OutputConfig, PiiConfig};
use crate::pii::PiiDetector;
use crate::types::{DetailRecord, PiiCategory, SanitizationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Note attached when an assertive claim cites no source
pub const UNSUPPORTED_CLAIM_NOTE: &str = "Potential assertion without a cited source. \
     Ask the agent to provide citations or confirm with read_lines/search.";

static DEFAULT_VALIDATOR: Lazy<OutputValidator> = Lazy::new(OutputValidator::default);

// First-person ownership or capability claims
static CLAIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(we have|our team|our project|we did|we built|our consultant|we have experience)\b",
    )
    .expect("claim pattern")
});

// Anything that looks like a source: a .json collection, a known document set,
// an ID such as PROJ001 or CONS-12, or the word "id"
static CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b[\w-]+\.json\b|\b(?:casos_estudio|propuestas)\b|\b[a-z]{2,}[-_]?\d{2,}\b|\bid\b",
    )
    .expect("citation pattern")
});

/// Output validator applied to every agent answer and tool result
#[derive(Debug, Clone)]
pub struct OutputValidator {
    pii: PiiDetector,
    config: OutputConfig,
}

impl Default for OutputValidator {
    fn default() -> Self {
        Self::new(PiiConfig::default(), OutputConfig::default())
    }
}

impl OutputValidator {
    /// Create a new validator
    pub fn new(pii: PiiConfig, config: OutputConfig) -> Self {
        Self {
            pii: PiiDetector::new(pii),
            config,
        }
    }

    /// Redact PII and annotate unsupported claims
    ///
    /// The claim heuristic is advisory: it adds a note and never changes the
    /// text or the safety flag.
    pub fn validate_and_sanitize(&self, text: &str) -> SanitizationResult {
        let mut details = DetailRecord::default();

        let found = self.pii.detect(text);
        let sanitized_text = if found.is_empty() {
            text.to_string()
        } else {
            let categories: Vec<PiiCategory> = found.keys().copied().collect();
            warn!(?categories, "PII detected and redacted in output");
            details.pii = found;
            self.pii.redact(text)
        };

        if self.config.flag_unsupported_claims && is_unsupported_claim(&sanitized_text) {
            warn!("Possible hallucination detected: strong claim without a cited source");
            details.hallucination_flag = true;
            details.notes.push(UNSUPPORTED_CLAIM_NOTE.to_string());
        }

        SanitizationResult {
            is_safe: !details.has_pii(),
            sanitized_text,
            details,
        }
    }

    /// Sanitize a tool result before it goes back into the reasoning loop
    pub fn redact_tool_output(&self, tool_name: &str, text: &str) -> (String, DetailRecord) {
        let SanitizationResult {
            is_safe,
            sanitized_text,
            mut details,
        } = self.validate_and_sanitize(text);

        if !is_safe {
            details.tool = Some(tool_name.to_string());
            details
                .notes
                .push(format!("Tool '{}' output redacted for PII", tool_name));
        }

        (sanitized_text, details)
    }
}

/// Assertive first-person claim with nothing that looks like a citation
pub fn is_unsupported_claim(text: &str) -> bool {
    CLAIM.is_match(text) && !CITATION.is_match(text)
}

/// Validate with the default PII settings
pub fn validate_and_sanitize_output(text: &str) -> SanitizationResult {
    DEFAULT_VALIDATOR.validate_and_sanitize(text)
}

/// Sanitize a tool result with the default PII settings
pub fn redact_tool_output(tool_name: &str, text: &str) -> (String, DetailRecord) {
    DEFAULT_VALIDATOR.redact_tool_output(tool_name, text)
}
