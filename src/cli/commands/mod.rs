//! CLI command implementations.

mod ask;
mod check;
mod config;
mod index;
mod search;
mod serve;

pub use ask::run_ask;
pub use check::run_check;
pub use config::run_config;
pub use index::run_index;
pub use search::run_search;
pub use serve::{router, run_serve, GREETING};
