//! Correlates `routerrpc.SubscribeHtlcEvents` events back to a payment
//! hash so the pipeline layer sees one terminal outcome per payment
//! instead of one event per HTLC attempt (a payment can retry over
//! several routes before settling or failing for good).

use crate::client::HtlcEvent;
use crate::client::HtlcStatus;
use std::collections::HashMap;

/// What a payment hash's HTLC history looks like so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtlcOutcome {
    /// At least one attempt is still in flight and none has succeeded.
    Pending,
    /// One of the attempts reached the destination.
    Succeeded,
    /// Every attempt failed or was canceled.
    Failed,
}

#[derive(Debug, Default, Clone)]
struct PaymentAttempts {
    pending: u32,
    succeeded: u32,
    failed: u32,
}

impl PaymentAttempts {
    fn outcome(&self) -> HtlcOutcome {
        if self.succeeded > 0 {
            HtlcOutcome::Succeeded
        } else if self.pending > 0 {
            HtlcOutcome::Pending
        } else {
            HtlcOutcome::Failed
        }
    }
}

/// In-memory correlation table, one entry per payment hash currently
/// being tracked. Entries are removed once `take_outcome` reports a
/// terminal state, matching `process_pending_hive.py`'s "drop from the
/// working set once resolved" pattern reused across the bridge.
#[derive(Debug, Default)]
pub struct HtlcCorrelator {
    by_hash: HashMap<String, PaymentAttempts>,
}

impl HtlcCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one HTLC event in and returns the payment's outcome so far.
    pub fn record(&mut self, event: &HtlcEvent) -> HtlcOutcome {
        let attempts = self.by_hash.entry(event.payment_hash_hex.clone()).or_default();
        match event.status {
            HtlcStatus::Pending => attempts.pending += 1,
            HtlcStatus::Succeeded => {
                attempts.succeeded += 1;
                attempts.pending = attempts.pending.saturating_sub(1);
            }
            HtlcStatus::Failed | HtlcStatus::Canceled => {
                attempts.failed += 1;
                attempts.pending = attempts.pending.saturating_sub(1);
            }
        }
        attempts.outcome()
    }

    /// Removes and returns a payment's outcome if it has reached a
    /// terminal state (`Succeeded` or `Failed`); leaves `Pending` entries
    /// untouched so later attempts keep accumulating into them.
    pub fn take_outcome(&mut self, payment_hash_hex: &str) -> Option<HtlcOutcome> {
        match self.by_hash.get(payment_hash_hex).map(PaymentAttempts::outcome) {
            Some(HtlcOutcome::Pending) | None => None,
            Some(terminal) => {
                self.by_hash.remove(payment_hash_hex);
                Some(terminal)
            }
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.by_hash.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn event(hash: &str, status: HtlcStatus) -> HtlcEvent {
        HtlcEvent {
            payment_hash_hex: hash.to_string(),
            htlc_index: 1,
            status,
            incoming: false,
            timestamp: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn pending_then_succeeded_resolves() {
        let mut c = HtlcCorrelator::new();
        assert_eq!(c.record(&event("abc", HtlcStatus::Pending)), HtlcOutcome::Pending);
        assert_eq!(c.take_outcome("abc"), None);
        assert_eq!(c.record(&event("abc", HtlcStatus::Succeeded)), HtlcOutcome::Succeeded);
        assert_eq!(c.take_outcome("abc"), Some(HtlcOutcome::Succeeded));
        assert_eq!(c.tracked_count(), 0);
    }

    #[test]
    fn all_attempts_failing_is_terminal_failure() {
        let mut c = HtlcCorrelator::new();
        c.record(&event("xyz", HtlcStatus::Pending));
        c.record(&event("xyz", HtlcStatus::Failed));
        assert_eq!(c.take_outcome("xyz"), Some(HtlcOutcome::Failed));
    }

    #[test]
    fn one_success_wins_over_other_failed_routes() {
        let mut c = HtlcCorrelator::new();
        c.record(&event("multi", HtlcStatus::Pending));
        c.record(&event("multi", HtlcStatus::Failed));
        c.record(&event("multi", HtlcStatus::Succeeded));
        assert_eq!(c.take_outcome("multi"), Some(HtlcOutcome::Succeeded));
    }
}
