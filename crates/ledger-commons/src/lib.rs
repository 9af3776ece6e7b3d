mod account;
mod conversion;
mod currency;
mod error;
mod ledger_entry;
mod memo;
mod quote;
mod tracked_op;

pub use crate::account::*;
pub use crate::conversion::*;
pub use crate::currency::*;
pub use crate::error::*;
pub use crate::ledger_entry::*;
pub use crate::memo::*;
pub use crate::quote::*;
pub use crate::tracked_op::*;

/// Millisatoshis per satoshi, per bitcoin, used throughout the conversion math.
pub const MSATS_PER_SAT: i64 = 1_000;
pub const SATS_PER_BTC: i64 = 100_000_000;

/// Any two sides of a balanced entry may disagree by at most this many msats
/// before it is treated as an invariant violation (SPEC_FULL.md §3.5, §8.1).
pub const MAX_MSAT_IMBALANCE: i64 = 1;
