//! Conversion pipelines (SPEC_FULL.md §4.M.1-M.8): the business state
//! machines that turn a tracked Hive/Lightning operation into ledger
//! entries and reply actions. Each module owns one pipeline; `bad_actors`
//! and `reply_dispatcher` are cross-cutting and used by several.

mod bad_actors;
mod custom_json_transfer;
mod exchange_rebalancer;
mod hive_to_keepsats;
mod hive_to_lightning;
mod hold_release;
mod keepsats_to_hive;
mod lightning_to_hive;
mod rate_limit;
mod reply_dispatcher;

pub use crate::bad_actors::*;
pub use crate::custom_json_transfer::*;
pub use crate::exchange_rebalancer::*;
pub use crate::hive_to_keepsats::*;
pub use crate::hive_to_lightning::*;
pub use crate::hold_release::*;
pub use crate::keepsats_to_hive::*;
pub use crate::lightning_to_hive::*;
pub use crate::rate_limit::*;
pub use crate::reply_dispatcher::*;
