//! Block-gap and node-time-skew detection, grounded on
//! `original_source/.../hive_models/op_base_counters.py`'s `BlockCounter`
//! (confirmed against
//! `original_source/tests/hive_models/test_op_base_counters.py`).

use time::Duration;
use time::OffsetDateTime;

/// How far the node's reported block timestamp may lag wall-clock `now`
/// before it is logged as a time-skew error.
pub const TIME_DIFFERENCE_CHECK: Duration = Duration::seconds(10);

/// Tracks block-to-block continuity for one stream (identified by `id`,
/// e.g. a node URL), surfacing both gaps (missed blocks) and excessive
/// lag between the node's block timestamp and local wall-clock time.
#[derive(Debug)]
pub struct BlockCounter {
    pub id: String,
    pub last_good_block: u64,
    pub current_block: u64,
    pub block_count: u64,
    pub time_diff: Duration,
    pub error_code: String,
}

impl BlockCounter {
    pub fn new(id: impl Into<String>, last_good_block: u64) -> Self {
        let current_block = last_good_block;
        Self {
            id: into_padded_id(id),
            last_good_block,
            current_block,
            block_count: 0,
            time_diff: Duration::ZERO,
            error_code: String::new(),
        }
    }

    /// Registers a newly observed block. Returns `(new_block, is_marker)`:
    /// `new_block` is true the first time this `block_num` is seen;
    /// `is_marker` is currently identical to `new_block` (every new block
    /// closes out the previous one, the same "block marker" signal the
    /// original hive streaming API emits once per block).
    pub fn inc(&mut self, block_num: u64, block_timestamp: OffsetDateTime) -> (bool, bool) {
        if block_num == self.current_block {
            return (false, false);
        }
        self.current_block = block_num;
        self.last_good_block = block_num;
        self.block_count += 1;
        self.log_time_difference_errors(block_timestamp);
        tracing::info!(
            id = %self.id,
            block_num,
            block_count = self.block_count,
            "new block"
        );
        (true, true)
    }

    /// The number of blocks skipped since `last_good_block`, or `0` if the
    /// stream is contiguous or this is the very first block observed.
    pub fn gap(&self, block_num: u64) -> u64 {
        block_num.saturating_sub(self.last_good_block).saturating_sub(1)
    }

    /// Updates `time_diff` against `now` and logs/clears `error_code`
    /// (`log_time_difference_errors`).
    pub fn log_time_difference_errors(&mut self, block_timestamp: OffsetDateTime) {
        let now = OffsetDateTime::now_utc();
        self.time_diff = now - block_timestamp;

        if self.time_diff > TIME_DIFFERENCE_CHECK {
            self.error_code = format!("{}Hive Time diff greater than {}s", self.id, TIME_DIFFERENCE_CHECK.whole_seconds());
            tracing::error!(id = %self.id, time_diff_secs = self.time_diff.whole_seconds(), "{}", self.error_code);
        } else if !self.error_code.is_empty() {
            tracing::warn!(id = %self.id, "{}cleared: time diff back within {}s", self.id, TIME_DIFFERENCE_CHECK.whole_seconds());
            self.error_code.clear();
        }
    }
}

fn into_padded_id(id: impl Into<String>) -> String {
    let id = id.into();
    if id.is_empty() {
        " ".to_string()
    } else {
        format!("{id} ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn new_block_advances_counters() {
        let mut counter = BlockCounter::new("test", 100);
        let (new_block, marker) = counter.inc(101, OffsetDateTime::now_utc());
        assert!(new_block);
        assert!(marker);
        assert_eq!(counter.current_block, 101);
        assert_eq!(counter.block_count, 1);
    }

    #[test]
    fn same_block_does_not_advance() {
        let mut counter = BlockCounter::new("test", 100);
        counter.current_block = 100;
        let (new_block, marker) = counter.inc(100, OffsetDateTime::now_utc());
        assert!(!new_block);
        assert!(!marker);
        assert_eq!(counter.block_count, 0);
    }

    #[test]
    fn gap_detects_skipped_blocks() {
        let counter = BlockCounter::new("test", 100);
        assert_eq!(counter.gap(101), 0);
        assert_eq!(counter.gap(105), 4);
    }

    #[test]
    fn stale_block_timestamp_sets_error_code() {
        let mut counter = BlockCounter::new("test_block_counter", 100);
        let stale = datetime!(2000-01-01 00:00:00 UTC);
        counter.log_time_difference_errors(stale);
        assert!(counter.error_code.contains("test_block_counter"));
    }
}
