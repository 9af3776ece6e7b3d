mod cache;
mod lock;
mod monitor;
mod mongo;
mod pending;
mod reports;
mod sanity;

pub use crate::cache::*;
pub use crate::lock::*;
pub use crate::monitor::*;
pub use crate::mongo::*;
pub use crate::pending::*;
pub use crate::reports::*;
pub use crate::sanity::*;
