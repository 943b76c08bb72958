#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokenblox::classifier::{FT_DATA_LEN, PROTO_FLAG, TYPE_FT};
use tokenblox::keys::{Family, Role, Scope, ScopeKeyScheme};
use tokenblox::reconcile::ViewReconciler;
use tokenblox::store::{Aggregate, Member, MemoryStore, OrderedSetStore, ScoredMember, StoreResult};
use tokenblox::types::Hash160;

pub const CONTRACT_CODE: &[u8] = &[0x51, 0x52, 0x53, 0x75];

pub fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

pub fn member(n: u32) -> Member {
    n.to_be_bytes().to_vec()
}

pub fn p2pkh_script(address: Hash160) -> Vec<u8> {
    let mut out = vec![0x76, 0xa9, 0x14];
    out.extend_from_slice(&address.0);
    out.extend_from_slice(&[0x88, 0xac]);
    out
}

pub fn ft_script(address: Hash160, amount: u64, genesis: Hash160) -> Vec<u8> {
    let mut out = CONTRACT_CODE.to_vec();
    let mut name = b"Space Coin".to_vec();
    name.resize(20, 0);
    let mut symbol = b"SPC".to_vec();
    symbol.resize(10, 0);
    out.extend(name);
    out.extend(symbol);
    out.push(4);
    out.extend_from_slice(&address.0);
    out.extend_from_slice(&amount.to_le_bytes());
    out.extend_from_slice(&genesis.0);
    out.extend_from_slice(&[1u8; 36]);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&TYPE_FT.to_le_bytes());
    out.extend_from_slice(PROTO_FLAG);
    assert_eq!(out.len(), CONTRACT_CODE.len() + FT_DATA_LEN);
    out
}

/// Writes the three layers of a view scope into `store`.
pub fn seed_view(
    store: &MemoryStore,
    family: Family,
    scope: &Scope,
    confirmed: &[(Member, i64)],
    pending_add: &[(Member, i64)],
    pending_remove: &[Member],
) {
    store.zadd_many(&family.key(scope, Role::Confirmed).unwrap(), confirmed.iter().cloned()).unwrap();
    store.zadd_many(&family.key(scope, Role::PendingAdd).unwrap(), pending_add.iter().cloned()).unwrap();
    store.zadd_many(
        &family.key(scope, Role::PendingRemove).unwrap(),
        pending_remove.iter().map(|m| (m.clone(), 0)),
    ).unwrap();
}

/// Pages through the whole view with pages of `size`.
pub async fn full_scan(view: &ViewReconciler, family: Family, scope: &Scope, size: i64) -> Vec<Member> {
    let mut out = Vec::new();
    let mut cursor = 0;
    loop {
        let page = view.get_page(&family, scope, cursor, size, deadline()).await.unwrap();
        let total = page.total;
        assert_eq!(
            total,
            page.total_confirmed as i64 + page.total_pending_add as i64 - page.total_pending_remove as i64
        );
        if page.members.is_empty() {
            break;
        }
        cursor += page.members.len() as i64;
        out.extend(page.members);
    }
    out
}

/// Descending (score, member), the order every backend ranks in.
pub fn ranked(entries: &[(Member, i64)], exclude: &HashSet<Member>) -> Vec<Member> {
    let mut kept: Vec<&(Member, i64)> = entries.iter().filter(|(m, _)| !exclude.contains(m)).collect();
    kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    kept.into_iter().map(|(m, _)| m.clone()).collect()
}

/// Delegates to a memory store after sleeping `delay` on every call.
pub struct SlowStore {
    pub inner: Arc<MemoryStore>,
    pub delay: Duration,
}

#[async_trait]
impl OrderedSetStore for SlowStore {
    async fn card(&self, key: &[u8]) -> StoreResult<u64> {
        tokio::time::sleep(self.delay).await;
        self.inner.card(key).await
    }

    async fn score(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<i64>> {
        tokio::time::sleep(self.delay).await;
        self.inner.score(key, member).await
    }

    async fn scores(&self, key: &[u8], members: &[Member]) -> StoreResult<Vec<Option<i64>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.scores(key, members).await
    }

    async fn rev_range(&self, key: &[u8], start: u64, count: u64) -> StoreResult<Vec<ScoredMember>> {
        tokio::time::sleep(self.delay).await;
        self.inner.rev_range(key, start, count).await
    }

    async fn range_by_score(&self, key: &[u8], min: i64, max: i64) -> StoreResult<Vec<ScoredMember>> {
        tokio::time::sleep(self.delay).await;
        self.inner.range_by_score(key, min, max).await
    }

    async fn store_top(&self, dest: &[u8], src: &[u8], count: u64) -> StoreResult<u64> {
        tokio::time::sleep(self.delay).await;
        self.inner.store_top(dest, src, count).await
    }

    async fn store_diff(&self, dest: &[u8], src: &[u8], subtract: &[&[u8]]) -> StoreResult<u64> {
        tokio::time::sleep(self.delay).await;
        self.inner.store_diff(dest, src, subtract).await
    }

    async fn store_union(&self, dest: &[u8], sources: &[&[u8]], aggregate: Aggregate) -> StoreResult<u64> {
        tokio::time::sleep(self.delay).await;
        self.inner.store_union(dest, sources, aggregate).await
    }

    async fn delete(&self, keys: &[&[u8]]) -> StoreResult<()> {
        self.inner.delete(keys).await
    }

    async fn get_many(&self, keys: &[Vec<u8>]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_many(keys).await
    }
}
