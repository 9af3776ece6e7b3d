//! Per-transaction operation numbering and recent-trx_id dedup, grounded on
//! `original_source/.../hive_models/op_base_counters.py`'s
//! `OpInTrxCounter` (confirmed against
//! `original_source/tests/hive_models/test_op_base_counters.py`).
//!
//! Virtual ops (fill_order, producer_reward, ...) share a `trx_id` of all
//! zeros and are numbered independently of real ops, so two stacks are
//! kept.

use std::collections::VecDeque;

const STACK_MAXLEN: usize = 50;
const ZERO_TRX_ID: &str = "0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpRealm {
    Real,
    Virtual,
}

/// Bounded recent-trx_id history plus the running `op_in_trx` counter for
/// one realm (real vs. virtual ops).
#[derive(Debug)]
pub struct OpInTrxCounter {
    realm: OpRealm,
    op_in_trx: u32,
    last_trx_id: String,
    real_stack: VecDeque<String>,
    virtual_stack: VecDeque<String>,
}

impl OpInTrxCounter {
    pub fn new(realm: OpRealm) -> Self {
        Self {
            realm,
            op_in_trx: 1,
            last_trx_id: String::new(),
            real_stack: VecDeque::with_capacity(STACK_MAXLEN),
            virtual_stack: VecDeque::with_capacity(STACK_MAXLEN),
        }
    }

    pub fn op_in_trx(&self) -> u32 {
        self.op_in_trx
    }

    pub fn last_trx_id(&self) -> &str {
        &self.last_trx_id
    }

    fn stack_mut(&mut self) -> &mut VecDeque<String> {
        match self.realm {
            OpRealm::Real => &mut self.real_stack,
            OpRealm::Virtual => &mut self.virtual_stack,
        }
    }

    /// Advances the counter for `trx_id`, returning the op's position
    /// within its transaction. The all-zeros `trx_id` used for virtual ops
    /// without a real transaction always resets to `1` and is never
    /// recorded in the history.
    ///
    /// The count is one plus how many times `trx_id` already appears in the
    /// last 50 entries recorded for this realm — not a simple "new vs.
    /// repeat" flag, since a shared, bounded multiset history is what lets
    /// two independently constructed counters for the same realm agree on
    /// the next op_in_trx for a trx_id either one last saw.
    pub fn inc(&mut self, trx_id: &str) -> u32 {
        if trx_id == ZERO_TRX_ID {
            self.op_in_trx = 1;
            self.last_trx_id = trx_id.to_string();
            return 1;
        }

        let stack = self.stack_mut();
        let occurrences = stack.iter().filter(|t| t.as_str() == trx_id).count() as u32;
        let count = occurrences + 1;

        if stack.len() == STACK_MAXLEN {
            stack.pop_front();
        }
        stack.push_back(trx_id.to_string());

        self.op_in_trx = count;
        self.last_trx_id = trx_id.to_string();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_same_trx_id() {
        let mut counter = OpInTrxCounter::new(OpRealm::Real);
        assert_eq!(counter.inc("trx123"), 1);
        assert_eq!(counter.inc("trx123"), 2);
        assert_eq!(counter.last_trx_id(), "trx123");
    }

    #[test]
    fn new_trx_id_resets_count() {
        let mut counter = OpInTrxCounter::new(OpRealm::Real);
        counter.inc("trx123");
        assert_eq!(counter.inc("trx456"), 1);
    }

    #[test]
    fn repeated_trx_id_in_recent_history_counts_occurrences() {
        let mut counter = OpInTrxCounter::new(OpRealm::Real);
        counter.real_stack.push_back("trx789".to_string());
        assert_eq!(counter.inc("trx789"), 2);
        assert_eq!(counter.inc("trx789"), 3);
    }

    #[test]
    fn zero_trx_id_always_resets() {
        let mut counter = OpInTrxCounter::new(OpRealm::Real);
        counter.inc("trx123");
        assert_eq!(counter.inc(ZERO_TRX_ID), 1);
        assert_eq!(counter.op_in_trx(), 1);
    }

    #[test]
    fn stacks_are_bounded() {
        let mut counter = OpInTrxCounter::new(OpRealm::Real);
        for i in 0..51 {
            counter.inc(&format!("trx{i}"));
        }
        assert_eq!(counter.real_stack.len(), STACK_MAXLEN);
        assert!(!counter.real_stack.contains(&"trx0".to_string()));
        assert!(counter.real_stack.contains(&"trx50".to_string()));
    }
}
