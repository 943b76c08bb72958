//! Balance and count scopes.
//!
//! `Balance` holds each member's value including pending activity and
//! `BalanceDelta` holds the pending part alone. Leaderboards rank by combined
//! value, so the pending-first ordering of member-list views does not apply.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::{drop_scratch, next_nonce, validate_page};
use crate::error::Result;
use crate::keys::{Role, Scope, ScopeKeyScheme, ScratchSlot};
use crate::store::{within, Aggregate, Member, OrderedSetStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateValue {
    pub confirmed_value: i64,
    pub pending_delta: i64,
}

impl AggregateValue {
    /// The part of the value no pending transaction can change.
    pub fn settled(&self) -> i64 {
        self.confirmed_value - self.pending_delta
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateEntry {
    pub member: Member,
    pub value: i64,
    pub pending_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopAggregates {
    pub entries: Vec<AggregateEntry>,
    /// Distinct members across both layers.
    pub total: u64,
}

pub struct AggregateReconciler {
    store: Arc<dyn OrderedSetStore>,
    max_page_size: u64,
}

impl AggregateReconciler {
    pub fn new(store: Arc<dyn OrderedSetStore>, max_page_size: u64) -> Self {
        Self { store, max_page_size }
    }

    /// A member absent from both layers has value zero.
    pub async fn get_aggregate(
        &self,
        scheme: &dyn ScopeKeyScheme,
        scope: &Scope,
        member: &[u8],
        deadline: Instant,
    ) -> Result<AggregateValue> {
        let balance_key = scheme.key(scope, Role::Balance)?;
        let delta_key = scheme.key(scope, Role::BalanceDelta)?;
        let store = self.store.as_ref();

        let confirmed_value = within(deadline, "score", store.score(&balance_key, member)).await?;
        let pending_delta = within(deadline, "score", store.score(&delta_key, member)).await?;

        Ok(AggregateValue {
            confirmed_value: confirmed_value.unwrap_or(0),
            pending_delta: pending_delta.unwrap_or(0),
        })
    }

    /// Members ranked by `max(balance, delta)`, with each member's pending
    /// delta fetched in one batched read.
    pub async fn get_top_aggregates(
        &self,
        scheme: &dyn ScopeKeyScheme,
        scope: &Scope,
        cursor: i64,
        size: i64,
        deadline: Instant,
    ) -> Result<TopAggregates> {
        let (cursor, size) = validate_page(cursor, size, self.max_page_size)?;
        let balance_key = scheme.key(scope, Role::Balance)?;
        let delta_key = scheme.key(scope, Role::BalanceDelta)?;
        let union_key = scheme.scratch_key(scope, ScratchSlot::Union, next_nonce())?;
        let store = self.store.as_ref();

        let ranked: Result<(u64, Vec<(Member, i64)>)> = async {
            let total = within(
                deadline,
                "store_union",
                store.store_union(&union_key, &[&balance_key, &delta_key], Aggregate::Max),
            )
            .await?;
            let page = within(deadline, "rev_range", store.rev_range(&union_key, cursor, size)).await?;
            Ok((total, page.into_iter().map(|e| (e.member, e.score)).collect()))
        }
        .await;
        drop_scratch(store, &[&union_key]).await;
        let (total, ranked) = ranked?;

        let members: Vec<Member> = ranked.iter().map(|(m, _)| m.clone()).collect();
        let deltas = if members.is_empty() {
            Vec::new()
        } else {
            within(deadline, "scores", store.scores(&delta_key, &members)).await?
        };

        let entries: Vec<AggregateEntry> = ranked
            .into_iter()
            .zip(deltas)
            .map(|((member, value), delta)| AggregateEntry {
                member,
                value,
                pending_delta: delta.unwrap_or(0),
            })
            .collect();

        debug!(family = scheme.name(), cursor, size, total, returned = entries.len(), "aggregate page");
        Ok(TopAggregates { entries, total })
    }
}
