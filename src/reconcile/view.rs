//! Paged view over `(Confirmed ∪ PendingAdd) \ PendingRemove`.
//!
//! Pending additions always come first, in their own score order, followed
//! by the surviving confirmed members. Only the top `k` of the confirmed
//! layer is ever copied, with `k` bounded by the page end plus the two
//! pending layers, so the work per page does not grow with the confirmed
//! collection.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::{drop_scratch, next_nonce, validate_page};
use crate::error::{QueryError, Result};
use crate::keys::{Role, Scope, ScopeKeyScheme, ScratchSlot};
use crate::metrics::record_view_page;
use crate::store::{within, Member, OrderedSetStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub members: Vec<Member>,
    /// `total_confirmed + total_pending_add - total_pending_remove`.
    pub total: i64,
    pub total_confirmed: u64,
    pub total_pending_add: u64,
    pub total_pending_remove: u64,
}

struct ViewKeys {
    confirmed: Vec<u8>,
    pending_add: Vec<u8>,
    pending_remove: Vec<u8>,
}

impl ViewKeys {
    fn derive(scheme: &dyn ScopeKeyScheme, scope: &Scope) -> Result<Self> {
        Ok(Self {
            confirmed: scheme.key(scope, Role::Confirmed)?,
            pending_add: scheme.key(scope, Role::PendingAdd)?,
            pending_remove: scheme.key(scope, Role::PendingRemove)?,
        })
    }
}

pub struct ViewReconciler {
    store: Arc<dyn OrderedSetStore>,
    max_page_size: u64,
}

impl ViewReconciler {
    pub fn new(store: Arc<dyn OrderedSetStore>, max_page_size: u64) -> Self {
        Self { store, max_page_size }
    }

    pub fn max_page_size(&self) -> u64 {
        self.max_page_size
    }

    pub async fn get_page(
        &self,
        scheme: &dyn ScopeKeyScheme,
        scope: &Scope,
        cursor: i64,
        size: i64,
        deadline: Instant,
    ) -> Result<Page> {
        let (cursor, size) = validate_page(cursor, size, self.max_page_size)?;
        let keys = ViewKeys::derive(scheme, scope)?;
        let store = self.store.as_ref();

        let pending_add = within(deadline, "card", store.card(&keys.pending_add)).await?;
        let confirmed = within(deadline, "card", store.card(&keys.confirmed)).await?;
        let pending_remove = within(deadline, "card", store.card(&keys.pending_remove)).await?;

        let end = cursor + size;
        let (members, path) = if end <= pending_add {
            let page = within(deadline, "rev_range", store.rev_range(&keys.pending_add, cursor, size)).await?;
            (page.into_iter().map(|e| e.member).collect(), "pending_only")
        } else {
            let mut members: Vec<Member> = Vec::with_capacity(size as usize);
            if cursor < pending_add {
                let head = within(
                    deadline,
                    "rev_range",
                    store.rev_range(&keys.pending_add, cursor, pending_add - cursor),
                )
                .await?;
                members.extend(head.into_iter().map(|e| e.member));
            }
            if confirmed == pending_remove {
                (members, "short_circuit")
            } else {
                let from = cursor.saturating_sub(pending_add);
                let to = end - pending_add;
                let rest = self
                    .confirmed_window(scheme, scope, &keys, from, to, pending_add, pending_remove, deadline)
                    .await?;
                members.extend(rest);
                (members, "merged")
            }
        };

        record_view_page(path);
        debug!(
            family = scheme.name(),
            cursor,
            size,
            confirmed,
            pending_add,
            pending_remove,
            returned = members.len(),
            path,
            "view page reconciled"
        );

        Ok(Page {
            members,
            total: confirmed as i64 + pending_add as i64 - pending_remove as i64,
            total_confirmed: confirmed,
            total_pending_add: pending_add,
            total_pending_remove: pending_remove,
        })
    }

    /// Ranks `[from, to)` of `Confirmed \ (PendingRemove ∪ PendingAdd)`.
    ///
    /// The diff also subtracts `PendingAdd` so a member the producer put in
    /// both layers is listed once, in the pending part; `k` grows by `A` to
    /// keep the window filled when that happens.
    #[allow(clippy::too_many_arguments)]
    async fn confirmed_window(
        &self,
        scheme: &dyn ScopeKeyScheme,
        scope: &Scope,
        keys: &ViewKeys,
        from: u64,
        to: u64,
        pending_add: u64,
        pending_remove: u64,
        deadline: Instant,
    ) -> Result<Vec<Member>> {
        let nonce = next_nonce();
        let top = scheme.scratch_key(scope, ScratchSlot::TopK, nonce)?;
        let diff = scheme.scratch_key(scope, ScratchSlot::Diff, nonce)?;
        let store = self.store.as_ref();
        let k = to + pending_remove + pending_add;

        let result: Result<Vec<Member>> = async {
            within(deadline, "store_top", store.store_top(&top, &keys.confirmed, k)).await?;
            within(
                deadline,
                "store_diff",
                store.store_diff(&diff, &top, &[&keys.pending_remove, &keys.pending_add]),
            )
            .await?;
            let window = within(deadline, "rev_range", store.rev_range(&diff, from, to - from)).await?;
            Ok(window.into_iter().map(|e| e.member).collect())
        }
        .await;

        drop_scratch(store, &[&top, &diff]).await;
        result
    }

    /// Entries of an indexed family whose index equals `index`.
    ///
    /// Pending hits come first. A confirmed hit that is pending removal is
    /// skipped, and an outpoint present in both layers is reported once, as
    /// the pending entry. No hit at all is `NotFound`.
    pub async fn find_by_index(
        &self,
        scheme: &dyn ScopeKeyScheme,
        scope: &Scope,
        index: i64,
        deadline: Instant,
    ) -> Result<Vec<Member>> {
        let pending_key = scheme.key(scope, Role::PendingIndexed)?;
        let indexed_key = scheme.key(scope, Role::Indexed)?;
        let remove_key = scheme.key(scope, Role::PendingRemove)?;
        let store = self.store.as_ref();

        let pending = within(deadline, "range_by_score", store.range_by_score(&pending_key, index, index)).await?;
        let confirmed = within(deadline, "range_by_score", store.range_by_score(&indexed_key, index, index)).await?;

        let confirmed: Vec<Member> = confirmed.into_iter().map(|e| e.member).collect();
        let removed = if confirmed.is_empty() {
            Vec::new()
        } else {
            within(deadline, "scores", store.scores(&remove_key, &confirmed)).await?
        };

        let mut seen: HashSet<Member> = HashSet::new();
        let mut out = Vec::with_capacity(pending.len() + confirmed.len());
        for member in pending.into_iter().map(|e| e.member) {
            if seen.insert(member.clone()) {
                out.push(member);
            }
        }
        for (member, removed) in confirmed.into_iter().zip(removed) {
            if removed.is_none() && seen.insert(member.clone()) {
                out.push(member);
            }
        }

        if out.is_empty() {
            return Err(QueryError::not_found(format!(
                "no {} entry with index {}",
                scheme.name(),
                index
            )));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Family, SCRATCH_TAG};
    use crate::store::MemoryStore;
    use crate::types::Hash160;
    use std::time::Duration;

    fn scope() -> Scope {
        Scope::Address(Hash160([0x11; 20]))
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    fn seed(store: &MemoryStore, confirmed: &[(&str, i64)], add: &[(&str, i64)], remove: &[&str]) {
        let family = Family::AddressUtxo;
        let s = scope();
        for (m, score) in confirmed {
            store.zadd(&family.key(&s, Role::Confirmed).unwrap(), m.as_bytes(), *score).unwrap();
        }
        for (m, score) in add {
            store.zadd(&family.key(&s, Role::PendingAdd).unwrap(), m.as_bytes(), *score).unwrap();
        }
        for m in remove {
            store.zadd(&family.key(&s, Role::PendingRemove).unwrap(), m.as_bytes(), 0).unwrap();
        }
    }

    fn names(page: &Page) -> Vec<String> {
        page.members
            .iter()
            .map(|m| String::from_utf8(m.clone()).unwrap())
            .collect()
    }

    fn reconciler(store: &Arc<MemoryStore>) -> ViewReconciler {
        ViewReconciler::new(store.clone(), 100)
    }

    #[tokio::test]
    async fn test_reference_scenario() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 10), ("b", 9), ("c", 8)], &[("d", 5)], &["b"]);
        let view = reconciler(&store);

        let first = view.get_page(&Family::AddressUtxo, &scope(), 0, 2, deadline()).await.unwrap();
        assert_eq!(names(&first), vec!["d", "a"]);
        assert_eq!(
            (first.total, first.total_confirmed, first.total_pending_add, first.total_pending_remove),
            (3, 3, 1, 1)
        );

        let second = view.get_page(&Family::AddressUtxo, &scope(), 1, 2, deadline()).await.unwrap();
        assert_eq!(names(&second), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_pending_only_window() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 10)], &[("x", 3), ("y", 2), ("z", 1)], &[]);
        let view = reconciler(&store);
        let page = view.get_page(&Family::AddressUtxo, &scope(), 1, 2, deadline()).await.unwrap();
        assert_eq!(names(&page), vec!["y", "z"]);
        let confirmed_key = Family::AddressUtxo.key(&scope(), Role::Confirmed).unwrap();
        assert_eq!(store.touched(&confirmed_key), 0);
    }

    #[tokio::test]
    async fn test_pending_add_precedes_higher_confirmed_scores() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 1000), ("b", 999)], &[("p", 1)], &[]);
        let page = reconciler(&store)
            .get_page(&Family::AddressUtxo, &scope(), 0, 10, deadline())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["p", "a", "b"]);
    }

    #[tokio::test]
    async fn test_short_circuit_when_all_confirmed_spent() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 2), ("b", 1)], &[("n", 1)], &["a", "b"]);
        let page = reconciler(&store)
            .get_page(&Family::AddressUtxo, &scope(), 0, 10, deadline())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["n"]);
        assert_eq!(page.total, 1);
        let confirmed_key = Family::AddressUtxo.key(&scope(), Role::Confirmed).unwrap();
        assert_eq!(store.touched(&confirmed_key), 0);
    }

    #[tokio::test]
    async fn test_tombstone_for_unknown_member_is_tolerated() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 3), ("b", 2), ("c", 1)], &[], &["ghost"]);
        let page = reconciler(&store)
            .get_page(&Family::AddressUtxo, &scope(), 0, 10, deadline())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["a", "b", "c"]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_ghost_tombstones_outnumbering_confirmed_hide_nothing() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 2), ("b", 1)], &[], &["x", "y", "z"]);
        let page = reconciler(&store)
            .get_page(&Family::AddressUtxo, &scope(), 0, 10, deadline())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["a", "b"]);
        assert_eq!(page.total, -1);
        assert_eq!(page.total_pending_remove, 3);
    }

    #[tokio::test]
    async fn test_overlap_listed_once() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 3), ("b", 2), ("c", 1)], &[("b", 7)], &[]);
        let page = reconciler(&store)
            .get_page(&Family::AddressUtxo, &scope(), 0, 10, deadline())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_cursor_past_end_is_empty() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 3)], &[("p", 1)], &[]);
        let page = reconciler(&store)
            .get_page(&Family::AddressUtxo, &scope(), 10, 5, deadline())
            .await
            .unwrap();
        assert!(page.members.is_empty());
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_invalid_arguments_rejected_before_store_access() {
        let store = Arc::new(MemoryStore::new());
        store.fail_keys_with_prefix(b"");
        let view = reconciler(&store);
        for (cursor, size) in [(-1, 10), (0, 0), (0, 101)] {
            let err = view
                .get_page(&Family::AddressUtxo, &scope(), cursor, size, deadline())
                .await
                .unwrap_err();
            assert!(matches!(err, QueryError::InvalidArgument(_)));
        }
    }

    #[tokio::test]
    async fn test_wrong_scope_shape_rejected() {
        let store = Arc::new(MemoryStore::new());
        let err = reconciler(&store)
            .get_page(&Family::FtUtxo, &scope(), 0, 10, deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_store_failure_fails_whole_page() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 3), ("b", 2)], &[("p", 1)], &[]);
        store.fail_keys_with_prefix(&[SCRATCH_TAG]);
        let err = reconciler(&store)
            .get_page(&Family::AddressUtxo, &scope(), 0, 10, deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_scratch_removed_after_page() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[("a", 3), ("b", 2)], &[("p", 1)], &["a"]);
        reconciler(&store)
            .get_page(&Family::AddressUtxo, &scope(), 0, 10, deadline())
            .await
            .unwrap();
        assert_eq!(store.count_collections_with_prefix(&[SCRATCH_TAG]), 0);
    }

    #[tokio::test]
    async fn test_find_by_index_dedupes_and_skips_spent() {
        let store = Arc::new(MemoryStore::new());
        let family = Family::SellByToken;
        let s = Scope::Token { code_hash: Hash160([1; 20]), genesis: Hash160([2; 20]) };
        let indexed = family.key(&s, Role::Indexed).unwrap();
        let pending = family.key(&s, Role::PendingIndexed).unwrap();
        let removed = family.key(&s, Role::PendingRemove).unwrap();
        store.zadd(&indexed, b"old", 7).unwrap();
        store.zadd(&indexed, b"both", 7).unwrap();
        store.zadd(&indexed, b"spent", 7).unwrap();
        store.zadd(&indexed, b"other", 8).unwrap();
        store.zadd(&pending, b"both", 7).unwrap();
        store.zadd(&pending, b"new", 7).unwrap();
        store.zadd(&removed, b"spent", 0).unwrap();

        let view = reconciler(&store);
        let hits = view.find_by_index(&family, &s, 7, deadline()).await.unwrap();
        assert_eq!(hits, vec![b"new".to_vec(), b"both".to_vec(), b"old".to_vec()]);

        let err = view.find_by_index(&family, &s, 9, deadline()).await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_by_index_requires_indexed_family() {
        let store = Arc::new(MemoryStore::new());
        let err = reconciler(&store)
            .find_by_index(&Family::AddressUtxo, &scope(), 1, deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }
}
