//! Guard counters for blocked inputs and redacted outputs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Exposition names of the counters
pub const INPUT_BLOCKED_TOTAL: &str = "bi_agent_guard_input_blocked_total";
pub const OUTPUT_REDACTED_TOTAL: &str = "bi_agent_guard_output_redacted_total";
pub const TOOL_REDACTED_TOTAL: &str = "bi_agent_guard_tool_redacted_total";

static GLOBAL: Lazy<Arc<GuardMetrics>> = Lazy::new(|| Arc::new(GuardMetrics::new()));

/// Monotonic counters shared by every caller of a guard.
///
/// Counters only ever go up; a fresh registry is the only way to start from
/// zero, which is what tests do.
#[derive(Debug, Default)]
pub struct GuardMetrics {
    input_blocked_total: AtomicU64,
    output_redacted_total: AtomicU64,
    tool_redacted_total: AtomicU64,
}

impl GuardMetrics {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used when none is injected
    pub fn global() -> Arc<GuardMetrics> {
        GLOBAL.clone()
    }

    pub fn record_input_blocked(&self) {
        self.input_blocked_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_output_redacted(&self) {
        self.output_redacted_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tool_redacted(&self) {
        self.tool_redacted_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            input_blocked_total: self.input_blocked_total.load(Ordering::Relaxed),
            output_redacted_total: self.output_redacted_total.load(Ordering::Relaxed),
            tool_redacted_total: self.tool_redacted_total.load(Ordering::Relaxed),
        }
    }

    /// Prometheus text exposition format
    pub fn render_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();
        for (name, help, value) in [
            (
                INPUT_BLOCKED_TOTAL,
                "Total number of user inputs blocked by guardrails or validators",
                snapshot.input_blocked_total,
            ),
            (
                OUTPUT_REDACTED_TOTAL,
                "Total number of outputs redacted by guardrails or validators",
                snapshot.output_redacted_total,
            ),
            (
                TOOL_REDACTED_TOTAL,
                "Total number of tool outputs redacted by guardrails or validators",
                snapshot.tool_redacted_total,
            ),
        ] {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{} {}", name, value);
        }
        out
    }
}

/// Counter values at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub input_blocked_total: u64,
    pub output_redacted_total: u64,
    pub tool_redacted_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fresh_registry_starts_at_zero() {
        assert_eq!(GuardMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_are_independent() {
        let metrics = GuardMetrics::new();
        metrics.record_input_blocked();
        metrics.record_tool_redacted();
        metrics.record_tool_redacted();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.input_blocked_total, 1);
        assert_eq!(snapshot.output_redacted_total, 0);
        assert_eq!(snapshot.tool_redacted_total, 2);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(GuardMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_output_redacted();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().output_redacted_total, 8000);
    }

    #[test]
    fn test_prometheus_rendering() {
        let metrics = GuardMetrics::new();
        metrics.record_input_blocked();

        let text = metrics.render_prometheus();
        assert!(text.contains("# TYPE bi_agent_guard_input_blocked_total counter"));
        assert!(text.contains("bi_agent_guard_input_blocked_total 1\n"));
        assert!(text.contains("bi_agent_guard_output_redacted_total 0\n"));
        assert!(text.contains("bi_agent_guard_tool_redacted_total 0\n"));
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&GuardMetrics::global(), &GuardMetrics::global()));
    }
}
