/// Chain Tip
///
/// The only fact this crate takes from the historical index is the best
/// chain height, used for confirmation counts. The indexer keeps it in the
/// `chain_state` column family under `sync_height`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::DB;

use crate::store::rocks::CF_CHAIN_STATE;
use crate::store::{StoreError, StoreResult};

#[async_trait]
pub trait ChainTip: Send + Sync {
    async fn best_height(&self) -> StoreResult<u32>;
}

/// Reads `chain_state/sync_height` (i32 LE).
pub struct RocksChainTip {
    db: Arc<DB>,
}

impl RocksChainTip {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db }
    }
}

pub fn read_sync_height(db: &DB) -> StoreResult<u32> {
    let cf_state = db
        .cf_handle(CF_CHAIN_STATE)
        .ok_or_else(|| StoreError::Backend("chain_state CF not found".to_string()))?;

    let height = match db.get_cf(cf_state, b"sync_height")? {
        Some(bytes) => {
            let raw: [u8; 4] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| StoreError::Backend("corrupt sync_height".to_string()))?;
            i32::from_le_bytes(raw)
        }
        None => 0,
    };
    Ok(height.max(0) as u32)
}

#[async_trait]
impl ChainTip for RocksChainTip {
    async fn best_height(&self) -> StoreResult<u32> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || read_sync_height(&db)).await?
    }
}

/// Settable tip for the memory backend and tests.
#[derive(Debug, Default)]
pub struct FixedTip(AtomicU32);

impl FixedTip {
    pub fn new(height: u32) -> Self {
        Self(AtomicU32::new(height))
    }

    pub fn set(&self, height: u32) {
        self.0.store(height, Ordering::Relaxed);
    }
}

#[async_trait]
impl ChainTip for FixedTip {
    async fn best_height(&self) -> StoreResult<u32> {
        Ok(self.0.load(Ordering::Relaxed))
    }
}
