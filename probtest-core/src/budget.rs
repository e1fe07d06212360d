// probtest-core/src/budget.rs
// ============================================================================
// Module: Budget Engine
// Description: Wall-clock and token consumption tracking across three nested
// scopes (suite, class, method), with atomic cross-scope propagation.
// Purpose: Detect exhaustion and serve as the framework's sole cancellation
// mechanism; there is no separate cooperative cancellation token.
// Dependencies: std::sync, std::time
// ============================================================================

//! ## Overview
//! A [`BudgetMonitor`] tracks one scope's ceilings. A [`BudgetStack`] holds
//! the three monitors in precedence order (suite, class, method) and answers
//! "is anything exhausted" and "record `k` tokens everywhere" as single
//! logical operations, matching the "deep inheritance" redesign from
//! composition over subclassing.

use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Scope
// ============================================================================

/// The nesting level a budget monitor tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetScope {
    /// Process-wide singleton; lifetime = process.
    Suite,
    /// One per test class; lifetime = class execution.
    Class,
    /// One per test method; single-threaded, lifetime = test method.
    Method,
}

impl BudgetScope {
    /// The scope's name as used in a termination-reason string, e.g.
    /// `suite_time_exhausted`.
    const fn label(self) -> &'static str {
        match self {
            Self::Suite => "suite",
            Self::Class => "class",
            Self::Method => "method",
        }
    }
}

// ============================================================================
// SECTION: Budget Monitor
// ============================================================================

/// Tracks consumption against a ceiling at one scope.
///
/// Ceilings are immutable after construction. `tokens_consumed` is
/// monotonically non-decreasing and updated via a compare-and-swap loop so
/// shared-scope monitors (class, suite) stay lock-free under concurrent
/// updates from parallel test classes.
#[derive(Debug)]
pub struct BudgetMonitor {
    /// Which scope this monitor tracks.
    scope: BudgetScope,
    /// Time ceiling in milliseconds; `0` means unlimited.
    time_ceiling_ms: u64,
    /// Token ceiling; `0` means unlimited.
    token_ceiling: i64,
    /// When this scope's wall clock started.
    wall_clock_start: Instant,
    /// Running token total, updated lock-free from parallel test classes.
    tokens_consumed: AtomicI64,
}

impl BudgetMonitor {
    /// Creates a new monitor for `scope`, starting its wall clock now.
    /// `time_ceiling_ms = 0` and `token_ceiling = 0` both mean unlimited.
    #[must_use]
    pub fn new(scope: BudgetScope, time_ceiling_ms: u64, token_ceiling: i64) -> Self {
        Self {
            scope,
            time_ceiling_ms,
            token_ceiling,
            wall_clock_start: Instant::now(),
            tokens_consumed: AtomicI64::new(0),
        }
    }

    /// The scope this monitor tracks.
    #[must_use]
    pub const fn scope(&self) -> BudgetScope {
        self.scope
    }

    /// Milliseconds elapsed since this monitor was constructed.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "a budget's wall-clock elapsed time never approaches u64::MAX milliseconds")]
    pub fn elapsed_ms(&self) -> u64 {
        self.wall_clock_start.elapsed().as_millis() as u64
    }

    /// Total tokens credited to this monitor so far.
    #[must_use]
    pub fn tokens_consumed(&self) -> i64 {
        self.tokens_consumed.load(Ordering::SeqCst)
    }

    /// Whether this monitor's time ceiling has been crossed. Always `false`
    /// when the ceiling is `0` (unlimited).
    #[must_use]
    pub fn is_time_exhausted(&self) -> bool {
        self.time_ceiling_ms > 0 && self.elapsed_ms() >= self.time_ceiling_ms
    }

    /// Whether this monitor's token ceiling has been crossed. Always `false`
    /// when the ceiling is `0` (unlimited).
    #[must_use]
    pub fn is_token_exhausted(&self) -> bool {
        self.token_ceiling > 0 && self.tokens_consumed() >= self.token_ceiling
    }

    /// Whether either ceiling has been crossed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.is_time_exhausted() || self.is_token_exhausted()
    }

    /// Credits `tokens` to this monitor. Negative values are clamped to zero
    /// since consumption only ever accumulates.
    pub fn record_tokens(&self, tokens: i64) {
        if tokens > 0 {
            self.tokens_consumed.fetch_add(tokens, Ordering::SeqCst);
        }
    }

    /// The termination-reason label this monitor would produce if exhausted,
    /// e.g. `suite_time_exhausted` or `class_token_exhausted`.
    fn exhaustion_label(&self) -> Option<String> {
        if self.is_time_exhausted() {
            Some(format!("{}_time_exhausted", self.scope.label()))
        } else if self.is_token_exhausted() {
            Some(format!("{}_token_exhausted", self.scope.label()))
        } else {
            None
        }
    }
}

// ============================================================================
// SECTION: Budget Stack
// ============================================================================

/// An ordered stack of budget monitors spanning suite, class, and method
/// scope, replacing deep inheritance with composition: exhaustion checks and
/// token updates simply walk the vector.
#[derive(Debug, Clone)]
pub struct BudgetStack {
    /// Monitors in exhaustion-check precedence order: suite, then class,
    /// then method.
    precedence: Vec<Arc<BudgetMonitor>>,
}

impl BudgetStack {
    /// Builds a stack from whichever scopes are active for this test. Pass
    /// only the monitors that actually apply; an empty stack never reports
    /// exhaustion.
    #[must_use]
    pub fn new(suite: Option<Arc<BudgetMonitor>>, class: Option<Arc<BudgetMonitor>>, method: Option<Arc<BudgetMonitor>>) -> Self {
        let precedence = [suite, class, method].into_iter().flatten().collect();
        Self {
            precedence,
        }
    }

    /// The first exhausted monitor in suite -> class -> method precedence,
    /// naming the termination reason, or `None` if nothing is exhausted.
    #[must_use]
    pub fn first_exhausted(&self) -> Option<String> {
        self.precedence.iter().find_map(|monitor| monitor.exhaustion_label())
    }

    /// Credits `tokens` to every active monitor in a single logical step,
    /// ordered from the smallest scope outward (method, then class, then
    /// suite) so a partial update that credits method but not suite never
    /// becomes observable.
    pub fn record_tokens_everywhere(&self, tokens: i64) {
        for monitor in self.precedence.iter().rev() {
            monitor.record_tokens(tokens);
        }
    }

    /// Renders a short summary of each active monitor's consumption, for the
    /// verdict's budget-summary section.
    #[must_use]
    pub fn summary(&self) -> Vec<BudgetSummaryEntry> {
        self.precedence
            .iter()
            .map(|monitor| BudgetSummaryEntry {
                scope: monitor.scope,
                elapsed_ms: monitor.elapsed_ms(),
                time_ceiling_ms: monitor.time_ceiling_ms,
                tokens_consumed: monitor.tokens_consumed(),
                token_ceiling: monitor.token_ceiling,
            })
            .collect()
    }
}

/// One scope's consumption snapshot, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSummaryEntry {
    /// The scope this entry reports on.
    pub scope: BudgetScope,
    /// Milliseconds elapsed in this scope.
    pub elapsed_ms: u64,
    /// The scope's configured time ceiling, `0` if unlimited.
    pub time_ceiling_ms: u64,
    /// Tokens consumed in this scope.
    pub tokens_consumed: i64,
    /// The scope's configured token ceiling, `0` if unlimited.
    pub token_ceiling: i64,
}

/// Duration helper for constructing a method-scope monitor from a
/// millisecond ceiling, kept here to avoid every call site importing
/// `std::time` directly.
#[must_use]
#[allow(clippy::cast_possible_truncation, reason = "budget ceilings are configured in milliseconds well below u64::MAX")]
pub const fn ceiling_from_duration(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;

    #[test]
    fn unlimited_ceilings_never_exhaust() {
        let monitor = BudgetMonitor::new(BudgetScope::Method, 0, 0);
        monitor.record_tokens(1_000_000);
        assert!(!monitor.is_exhausted());
    }

    #[test]
    fn token_ceiling_exhausts_at_or_above_limit() {
        let monitor = BudgetMonitor::new(BudgetScope::Method, 0, 100);
        monitor.record_tokens(99);
        assert!(!monitor.is_token_exhausted());
        monitor.record_tokens(1);
        assert!(monitor.is_token_exhausted());
    }

    #[test]
    fn stack_reports_first_exhausted_in_suite_class_method_precedence() {
        let suite = Arc::new(BudgetMonitor::new(BudgetScope::Suite, 0, 10));
        let class = Arc::new(BudgetMonitor::new(BudgetScope::Class, 0, 10));
        let method = Arc::new(BudgetMonitor::new(BudgetScope::Method, 0, 10));
        let stack = BudgetStack::new(Some(suite.clone()), Some(class.clone()), Some(method));

        class.record_tokens(10);
        suite.record_tokens(10);

        assert_eq!(stack.first_exhausted(), Some("suite_token_exhausted".to_string()));
    }

    #[test]
    fn recording_tokens_credits_every_active_monitor_atomically() {
        let suite = Arc::new(BudgetMonitor::new(BudgetScope::Suite, 0, 0));
        let class = Arc::new(BudgetMonitor::new(BudgetScope::Class, 0, 0));
        let method = Arc::new(BudgetMonitor::new(BudgetScope::Method, 0, 0));
        let stack = BudgetStack::new(Some(suite.clone()), Some(class.clone()), Some(method.clone()));

        stack.record_tokens_everywhere(42);

        assert_eq!(suite.tokens_consumed(), 42);
        assert_eq!(class.tokens_consumed(), 42);
        assert_eq!(method.tokens_consumed(), 42);
    }

    #[test]
    fn empty_stack_never_reports_exhaustion() {
        let stack = BudgetStack::new(None, None, None);
        assert_eq!(stack.first_exhausted(), None);
    }
}
