//! PII (Personally Identifiable Information) detection and redaction

use crate::config::PiiConfig;
use crate::types::{PiiCategory, PiiMatches};
use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

/// Replacement used when no other placeholder is configured
pub const DEFAULT_PLACEHOLDER: &str = "[REDACTED]";

/// Shortest and longest digit count accepted as a payment card
const CARD_MIN_DIGITS: usize = 13;
const CARD_MAX_DIGITS: usize = 19;

/// Upper bound on substitution passes; a changing pass always consumes digits or '@'
const MAX_REDACTION_PASSES: usize = 8;

static PATTERNS: Lazy<PiiPatterns> = Lazy::new(PiiPatterns::new);

struct PiiPatterns {
    email: Regex,
    phone: Regex,
    credit_card: Regex,
    ssn: Regex,
    iban: Regex,
}

impl PiiPatterns {
    fn new() -> Self {
        Self {
            // local@domain.tld
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .expect("email pattern"),
            // +CC (AREA) 555-1234 and looser variants; over-matches other numbers
            phone: Regex::new(r"(?:(?:\+\d{1,3}[- ]?)?\(?\d{1,4}\)?[- ]?)?\d{3,4}[- ]?\d{4}")
                .expect("phone pattern"),
            // Superset of card numbers; every hit still has to pass Luhn
            credit_card: Regex::new(r"\b(?:\d[ -]*?){13,19}\b").expect("card pattern"),
            // US SSN: 123-45-6789
            ssn: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("ssn pattern"),
            // Country code, check digits, BBAN (no checksum)
            iban: Regex::new(r"\b[A-Z]{2}\d{2}[A-Z0-9]{1,30}\b").expect("iban pattern"),
        }
    }
}

/// PII detector for identifying and redacting sensitive information
///
/// The compiled patterns are shared process-wide; a detector only carries
/// its configuration, so it is cheap to build and safe to share.
#[derive(Debug, Clone)]
pub struct PiiDetector {
    config: PiiConfig,
}

impl Default for PiiDetector {
    fn default() -> Self {
        Self::new(PiiConfig::default())
    }
}

impl PiiDetector {
    /// Create a new PII detector with the given configuration
    pub fn new(config: PiiConfig) -> Self {
        Self { config }
    }

    /// Placeholder written over every redacted span
    pub fn placeholder(&self) -> &str {
        &self.config.placeholder
    }

    fn enabled(&self, category: PiiCategory) -> bool {
        self.config.enabled
            && match category {
                PiiCategory::Emails => self.config.detect_emails,
                PiiCategory::Phones => self.config.detect_phones,
                PiiCategory::CreditCards => self.config.detect_credit_cards,
                PiiCategory::Ssn => self.config.detect_ssn,
                PiiCategory::Iban => self.config.detect_iban,
            }
    }

    /// Detect all PII in the given text
    ///
    /// Each category is scanned independently over the original text, so one
    /// span can be reported under several categories.
    pub fn detect(&self, text: &str) -> PiiMatches {
        let mut found = PiiMatches::new();

        for category in PiiCategory::ALL {
            if !self.enabled(category) {
                continue;
            }
            let matches: Vec<String> = match category {
                PiiCategory::CreditCards => PATTERNS
                    .credit_card
                    .find_iter(text)
                    .map(|m| m.as_str())
                    .filter(|candidate| luhn_check(candidate))
                    .map(str::to_string)
                    .collect(),
                _ => pattern_for(category)
                    .find_iter(text)
                    .map(|m| m.as_str().to_string())
                    .collect(),
            };
            if !matches.is_empty() {
                found.insert(category, matches);
            }
        }

        found
    }

    /// Redact PII from text
    ///
    /// Passes repeat until the text stops changing: a replaced span adds word
    /// boundaries that can expose a new match, and repeating keeps
    /// `redact(redact(s)) == redact(s)`.
    pub fn redact(&self, text: &str) -> String {
        let mut current = self.redact_pass(text);
        for _ in 1..MAX_REDACTION_PASSES {
            let next = self.redact_pass(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// One substitution pass over every enabled category
    ///
    /// Cards go first so a long digit run is judged by Luhn before the looser
    /// phone pattern can split it; then emails, SSNs, IBANs and phones. IBANs
    /// precede phones because the phone pattern matches inside account numbers.
    fn redact_pass(&self, text: &str) -> String {
        let placeholder = self.config.placeholder.as_str();
        let mut redacted = text.to_string();

        if self.enabled(PiiCategory::CreditCards) {
            redacted = PATTERNS
                .credit_card
                .replace_all(&redacted, |caps: &Captures| {
                    if luhn_check(&caps[0]) {
                        placeholder.to_string()
                    } else {
                        caps[0].to_string()
                    }
                })
                .into_owned();
        }

        for category in [
            PiiCategory::Emails,
            PiiCategory::Ssn,
            PiiCategory::Iban,
            PiiCategory::Phones,
        ] {
            if self.enabled(category) {
                redacted = pattern_for(category)
                    .replace_all(&redacted, NoExpand(placeholder))
                    .into_owned();
            }
        }

        redacted
    }
}

fn pattern_for(category: PiiCategory) -> &'static Regex {
    match category {
        PiiCategory::Emails => &PATTERNS.email,
        PiiCategory::Phones => &PATTERNS.phone,
        PiiCategory::CreditCards => &PATTERNS.credit_card,
        PiiCategory::Ssn => &PATTERNS.ssn,
        PiiCategory::Iban => &PATTERNS.iban,
    }
}

/// Detect PII with every category enabled
pub fn detect_pii(text: &str) -> PiiMatches {
    PiiDetector::default().detect(text)
}

/// Redact PII with every category enabled
pub fn redact_pii(text: &str, placeholder: &str) -> String {
    PiiDetector::new(PiiConfig {
        placeholder: placeholder.to_string(),
        ..Default::default()
    })
    .redact(text)
}

/// Luhn algorithm for credit card validation
///
/// Spaces and dashes are ignored. Anything outside 13..=19 digits fails.
pub fn luhn_check(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();

    if !(CARD_MIN_DIGITS..=CARD_MAX_DIGITS).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &digit)| {
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "Contact: juan.perez@example.com, phone +1 555-123-4567, card 4111 1111 1111 1111";

    #[test]
    fn test_luhn() {
        assert!(luhn_check("4111111111111111"));
        assert!(luhn_check("4111 1111 1111 1111"));
        assert!(luhn_check("4532-0151-1283-0366"));
        assert!(!luhn_check("4111111111111112"));
        assert!(!luhn_check("1234567890123456"));
        // Too short even though the checksum works out
        assert!(!luhn_check("0000000000"));
    }

    #[test]
    fn test_luhn_length_bounds() {
        assert!(luhn_check("0000000000000")); // 13 digits
        assert!(luhn_check("0000000000000000000")); // 19 digits
        assert!(!luhn_check("00000000000000000000")); // 20 digits
    }

    #[test]
    fn test_detect_sample() {
        let found = detect_pii(SAMPLE);

        assert_eq!(found[&PiiCategory::Emails], vec!["juan.perez@example.com"]);
        assert!(found[&PiiCategory::Phones].contains(&"+1 555-123-4567".to_string()));
        assert_eq!(found[&PiiCategory::CreditCards], vec!["4111 1111 1111 1111"]);
        assert!(!found.contains_key(&PiiCategory::Ssn));
        assert!(!found.contains_key(&PiiCategory::Iban));
    }

    #[test]
    fn test_redact_sample() {
        let redacted = redact_pii(SAMPLE, DEFAULT_PLACEHOLDER);

        assert!(!redacted.contains("juan.perez@example.com"));
        assert!(!redacted.contains("555-123-4567"));
        assert!(!redacted.contains("4111"));
        assert_eq!(
            redacted,
            "Contact: [REDACTED], phone [REDACTED], card [REDACTED]"
        );
    }

    #[test]
    fn test_luhn_gate_on_detection() {
        let found = detect_pii("order ref 4111 1111 1111 1112 is pending");
        assert!(!found.contains_key(&PiiCategory::CreditCards));

        let found = detect_pii("card 4111111111111111 on file");
        assert_eq!(found[&PiiCategory::CreditCards], vec!["4111111111111111"]);
    }

    #[test]
    fn test_ssn_and_iban() {
        let text = "SSN 123-45-6789, account ES9121000418450200051332";
        let found = detect_pii(text);

        assert_eq!(found[&PiiCategory::Ssn], vec!["123-45-6789"]);
        assert_eq!(found[&PiiCategory::Iban], vec!["ES9121000418450200051332"]);

        let redacted = redact_pii(text, "#");
        assert_eq!(redacted, "SSN #, account #");
    }

    #[test]
    fn test_multiple_occurrences_keep_order() {
        let text = "b@two.org then a@one.org then b@two.org";
        let found = detect_pii(text);
        assert_eq!(
            found[&PiiCategory::Emails],
            vec!["b@two.org", "a@one.org", "b@two.org"]
        );
    }

    #[test]
    fn test_clean_text_untouched() {
        let text = "Consultants with Python experience: see consultores.json";
        assert!(detect_pii(text).is_empty());
        assert_eq!(redact_pii(text, DEFAULT_PLACEHOLDER), text);
    }

    #[test]
    fn test_configured_placeholder() {
        let detector = PiiDetector::new(PiiConfig {
            placeholder: "***".to_string(),
            ..Default::default()
        });

        assert_eq!(detector.placeholder(), "***");
        assert_eq!(detector.redact("SSN 123-45-6789"), "SSN ***");
    }

    #[test]
    fn test_placeholder_not_expanded() {
        let redacted = redact_pii("mail me at x@y.com", "$0");
        assert_eq!(redacted, "mail me at $0");
    }

    #[test]
    fn test_luhn_invalid_long_run_left_to_phone_pattern() {
        // Not a card, but the permissive phone pattern still masks it
        let text = "ticket 1234 5678 9012 3456";
        let found = detect_pii(text);
        assert!(!found.contains_key(&PiiCategory::CreditCards));
        assert!(found.contains_key(&PiiCategory::Phones));
        assert!(!redact_pii(text, DEFAULT_PLACEHOLDER).contains("5678"));
    }

    #[test]
    fn test_card_redaction_takes_whole_run() {
        // Card first: the whole number becomes one placeholder, not two
        let redacted = redact_pii("pay with 4532015112830366 today", DEFAULT_PLACEHOLDER);
        assert_eq!(redacted, "pay with [REDACTED] today");
    }

    #[test]
    fn test_disabled_categories() {
        let detector = PiiDetector::new(PiiConfig {
            detect_phones: false,
            detect_credit_cards: false,
            ..Default::default()
        });
        let found = detector.detect(SAMPLE);
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![PiiCategory::Emails]);

        let disabled = PiiDetector::new(PiiConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(disabled.detect(SAMPLE).is_empty());
        assert_eq!(disabled.redact(SAMPLE), SAMPLE);
    }

    #[test]
    fn test_redaction_idempotent() {
        let samples = [
            SAMPLE,
            "SSN 123-45-6789 and IBAN DE89370400440532013000",
            "call (34) 912 345 678 or 600-123-456",
            "nothing to see here",
            "ticket 1234 5678 9012 3456 and a@b.co",
        ];
        for sample in samples {
            let once = redact_pii(sample, DEFAULT_PLACEHOLDER);
            let twice = redact_pii(&once, DEFAULT_PLACEHOLDER);
            assert_eq!(once, twice, "not stable for {:?}", sample);
        }
    }
}
