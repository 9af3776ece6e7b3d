mod client;
mod htlc;
mod supervisor;

pub use crate::client::*;
pub use crate::htlc::*;
pub use crate::supervisor::*;
