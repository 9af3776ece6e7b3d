mod adapter;
mod block_counter;
mod client;
mod op_in_trx_counter;

pub use crate::adapter::*;
pub use crate::block_counter::*;
pub use crate::client::*;
pub use crate::op_in_trx_counter::*;
