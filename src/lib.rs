//! tokenblox: token explorer queries reconciled against the mempool.
//!
//! Confirmed summaries and pending deltas live side by side in an ordered-set
//! store; every request merges them into one paginated view.

pub mod api;
pub mod assemble;
pub mod chain_state;
pub mod classifier;
pub mod config;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod reconcile;
pub mod resolver;
pub mod store;
pub mod telemetry;
pub mod types;

pub use error::{QueryError, Result};
