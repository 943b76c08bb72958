//! Mempool-aware reconciliation of scoped collections.
//!
//! `view` merges member-list scopes (UTXOs, listings) with pending entries
//! first; `aggregate` handles balance and count scopes, where both layers hold
//! the same member and the result is ranked by combined value.

pub mod aggregate;
pub mod view;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{QueryError, Result};
use crate::store::{within, OrderedSetStore};
use crate::telemetry::short_hex;

pub use aggregate::{AggregateEntry, AggregateReconciler, AggregateValue, TopAggregates};
pub use view::{Page, ViewReconciler};

/// Scratch removal gets its own budget so an exhausted request deadline
/// does not leave scratch collections behind.
const SCRATCH_CLEANUP_TIMEOUT: Duration = Duration::from_millis(500);

static NEXT_NONCE: AtomicU64 = AtomicU64::new(1);

/// Request nonce for scratch collection names.
pub(crate) fn next_nonce() -> u64 {
    NEXT_NONCE.fetch_add(1, Ordering::Relaxed)
}

/// Checks `cursor >= 0` and `0 < size <= max_page_size`.
pub(crate) fn validate_page(cursor: i64, size: i64, max_page_size: u64) -> Result<(u64, u64)> {
    if cursor < 0 {
        return Err(QueryError::invalid(format!("cursor must be >= 0, got {}", cursor)));
    }
    if size <= 0 || size as u64 > max_page_size {
        return Err(QueryError::invalid(format!(
            "size must be in 1..={}, got {}",
            max_page_size, size
        )));
    }
    Ok((cursor as u64, size as u64))
}

/// Best-effort scratch removal. Failures are logged, never returned.
pub(crate) async fn drop_scratch(store: &dyn OrderedSetStore, keys: &[&[u8]]) {
    let deadline = Instant::now() + SCRATCH_CLEANUP_TIMEOUT;
    if let Err(e) = within(deadline, "delete", store.delete(keys)).await {
        let names: Vec<String> = keys.iter().map(|k| short_hex(k)).collect();
        debug!(error = %e, scratch = ?names, "scratch cleanup failed");
    }
}
