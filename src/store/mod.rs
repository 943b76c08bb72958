//! Ordered-set store contract.
//!
//! A store holds named sorted collections (member → i64 score) and scalar
//! byte records. Ranks are descending: rank 0 is the highest score, ties are
//! broken by descending member bytes. Every `store_*` operation replaces its
//! destination atomically.

pub mod memory;
pub mod rocks;

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;

use crate::metrics::{record_store_error, OpTimer};

pub use memory::MemoryStore;
pub use rocks::RocksStore;

pub type Member = Vec<u8>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMember {
    pub member: Member,
    pub score: i64,
}

impl ScoredMember {
    pub fn new(member: impl Into<Member>, score: i64) -> Self {
        Self { member: member.into(), score }
    }
}

/// How `store_union` combines scores of a member present in several sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Max,
}

impl Aggregate {
    pub fn combine(self, a: i64, b: i64) -> i64 {
        match self {
            Aggregate::Sum => a.saturating_add(b),
            Aggregate::Max => a.max(b),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("{op} timed out")]
    Timeout { op: &'static str },
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Read side of the sorted-collection service plus the record store.
///
/// The reconcilers only ever hold this trait, so they can write nothing but
/// scratch collections (`store_*`, `delete`). Population of confirmed and
/// pending collections belongs to the ingestion side, which uses the write
/// helpers of the concrete backends.
#[async_trait]
pub trait OrderedSetStore: Send + Sync {
    async fn card(&self, key: &[u8]) -> StoreResult<u64>;

    async fn score(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<i64>>;

    /// Pipelined score lookup, one entry per requested member.
    async fn scores(&self, key: &[u8], members: &[Member]) -> StoreResult<Vec<Option<i64>>>;

    /// Up to `count` members starting at descending rank `start`.
    async fn rev_range(&self, key: &[u8], start: u64, count: u64) -> StoreResult<Vec<ScoredMember>>;

    /// Members with `min <= score <= max`, descending.
    async fn range_by_score(&self, key: &[u8], min: i64, max: i64) -> StoreResult<Vec<ScoredMember>>;

    /// Copies the top `count` members of `src` into `dest`. Returns the new size of `dest`.
    async fn store_top(&self, dest: &[u8], src: &[u8], count: u64) -> StoreResult<u64>;

    /// `dest = src \ (subtract[0] ∪ subtract[1] ∪ ...)`, keeping `src` scores.
    /// Subtracting members absent from `src` is a no-op.
    async fn store_diff(&self, dest: &[u8], src: &[u8], subtract: &[&[u8]]) -> StoreResult<u64>;

    async fn store_union(&self, dest: &[u8], sources: &[&[u8]], aggregate: Aggregate) -> StoreResult<u64>;

    async fn delete(&self, keys: &[&[u8]]) -> StoreResult<()>;

    /// Pipelined scalar get against the record store.
    async fn get_many(&self, keys: &[Vec<u8>]) -> StoreResult<Vec<Option<Vec<u8>>>>;
}

/// Runs one store operation under the request deadline, timing it and
/// counting failures.
pub async fn within<T, F>(deadline: Instant, op: &'static str, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    let _timer = OpTimer::new(op);
    let result = match tokio::time::timeout_at(deadline.into(), fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { op }),
    };
    if result.is_err() {
        record_store_error(op);
    }
    result
}

/// Descending (score, member) order used by every backend.
pub(crate) fn rank_order(a: &ScoredMember, b: &ScoredMember) -> std::cmp::Ordering {
    b.score.cmp(&a.score).then_with(|| b.member.cmp(&a.member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_within_times_out() {
        let deadline = Instant::now() + Duration::from_millis(10);
        let result: StoreResult<()> = within(deadline, "card", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout { op: "card" })));
    }

    #[tokio::test]
    async fn test_within_passes_result() {
        let deadline = Instant::now() + Duration::from_secs(1);
        let result = within(deadline, "card", async { Ok(7u64) }).await.unwrap();
        assert_eq!(result, 7);
    }

    #[test]
    fn test_aggregate_combine() {
        assert_eq!(Aggregate::Sum.combine(3, 4), 7);
        assert_eq!(Aggregate::Max.combine(3, -4), 3);
        assert_eq!(Aggregate::Sum.combine(i64::MAX, 1), i64::MAX);
    }

    #[test]
    fn test_rank_order_ties_by_member() {
        let mut items = vec![
            ScoredMember::new(b"a".to_vec(), 1),
            ScoredMember::new(b"b".to_vec(), 1),
            ScoredMember::new(b"c".to_vec(), 2),
        ];
        items.sort_by(rank_order);
        let order: Vec<&[u8]> = items.iter().map(|i| i.member.as_slice()).collect();
        assert_eq!(order, vec![b"c".as_slice(), b"b", b"a"]);
    }
}
