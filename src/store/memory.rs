//! In-process ordered-set store.
//!
//! Each operation runs under one lock, so every `store_*` is atomic. The store
//! counts the elements each operation reads out of a collection
//! (`touched`), which lets tests assert how much of a large collection a
//! request actually walked.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Aggregate, Member, OrderedSetStore, ScoredMember, StoreError, StoreResult};

#[derive(Default, Clone)]
struct SortedSet {
    scores: HashMap<Member, i64>,
    /// Ascending (score, member); iterate in reverse for rank order.
    ranked: BTreeSet<(i64, Member)>,
}

impl SortedSet {
    fn insert(&mut self, member: Member, score: i64) {
        if let Some(old) = self.scores.insert(member.clone(), score) {
            self.ranked.remove(&(old, member.clone()));
        }
        self.ranked.insert((score, member));
    }

    fn remove(&mut self, member: &[u8]) -> bool {
        match self.scores.remove(member) {
            Some(old) => {
                self.ranked.remove(&(old, member.to_vec()));
                true
            }
            None => false,
        }
    }

    fn len(&self) -> u64 {
        self.scores.len() as u64
    }
}

#[derive(Default)]
struct Inner {
    sets: HashMap<Vec<u8>, SortedSet>,
    records: HashMap<Vec<u8>, Vec<u8>>,
    touched: HashMap<Vec<u8>, u64>,
    failing_prefixes: Vec<Vec<u8>>,
}

impl Inner {
    fn touch(&mut self, key: &[u8], n: u64) {
        if n > 0 {
            *self.touched.entry(key.to_vec()).or_insert(0) += n;
        }
    }

    fn check(&self, keys: &[&[u8]]) -> StoreResult<()> {
        for key in keys {
            if self.failing_prefixes.iter().any(|p| key.starts_with(p)) {
                return Err(StoreError::Backend(format!(
                    "injected failure for key {}",
                    hex::encode(key)
                )));
            }
        }
        Ok(())
    }

    fn replace(&mut self, dest: &[u8], set: SortedSet) -> u64 {
        let len = set.len();
        if len == 0 {
            self.sets.remove(dest);
        } else {
            self.sets.insert(dest.to_vec(), set);
        }
        len
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    // ---- ingestion side ------------------------------------------------

    pub fn zadd(&self, key: &[u8], member: &[u8], score: i64) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.sets.entry(key.to_vec()).or_default().insert(member.to_vec(), score);
        Ok(())
    }

    pub fn zadd_many<I, M>(&self, key: &[u8], entries: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (M, i64)>,
        M: Into<Member>,
    {
        let mut inner = self.lock()?;
        let set = inner.sets.entry(key.to_vec()).or_default();
        for (member, score) in entries {
            set.insert(member.into(), score);
        }
        Ok(())
    }

    pub fn zrem(&self, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let removed = inner.sets.get_mut(key).map(|s| s.remove(member)).unwrap_or(false);
        if inner.sets.get(key).map(|s| s.len() == 0).unwrap_or(false) {
            inner.sets.remove(key);
        }
        Ok(removed)
    }

    pub fn put_record(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.lock()?.records.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    pub fn remove_record(&self, key: &[u8]) -> StoreResult<()> {
        self.lock()?.records.remove(key);
        Ok(())
    }

    // ---- instrumentation -------------------------------------------------

    /// Elements read out of `key` since the last reset.
    pub fn touched(&self, key: &[u8]) -> u64 {
        self.lock()
            .map(|inner| inner.touched.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn reset_touched(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.touched.clear();
        }
    }

    /// Every operation touching a key that starts with `prefix` fails.
    pub fn fail_keys_with_prefix(&self, prefix: &[u8]) {
        if let Ok(mut inner) = self.lock() {
            inner.failing_prefixes.push(prefix.to_vec());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.failing_prefixes.clear();
        }
    }

    pub fn collection_exists(&self, key: &[u8]) -> bool {
        self.lock().map(|inner| inner.sets.contains_key(key)).unwrap_or(false)
    }

    /// Number of live collections whose name starts with `prefix`.
    pub fn count_collections_with_prefix(&self, prefix: &[u8]) -> usize {
        self.lock()
            .map(|inner| inner.sets.keys().filter(|k| k.starts_with(prefix)).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl OrderedSetStore for MemoryStore {
    async fn card(&self, key: &[u8]) -> StoreResult<u64> {
        let inner = self.lock()?;
        inner.check(&[key])?;
        Ok(inner.sets.get(key).map(|s| s.len()).unwrap_or(0))
    }

    async fn score(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<i64>> {
        let inner = self.lock()?;
        inner.check(&[key])?;
        Ok(inner.sets.get(key).and_then(|s| s.scores.get(member).copied()))
    }

    async fn scores(&self, key: &[u8], members: &[Member]) -> StoreResult<Vec<Option<i64>>> {
        let inner = self.lock()?;
        inner.check(&[key])?;
        let set = inner.sets.get(key);
        Ok(members
            .iter()
            .map(|m| set.and_then(|s| s.scores.get(m).copied()))
            .collect())
    }

    async fn rev_range(&self, key: &[u8], start: u64, count: u64) -> StoreResult<Vec<ScoredMember>> {
        let mut inner = self.lock()?;
        inner.check(&[key])?;
        let (out, len): (Vec<ScoredMember>, u64) = match inner.sets.get(key) {
            Some(set) => (
                set.ranked
                    .iter()
                    .rev()
                    .skip(start as usize)
                    .take(count as usize)
                    .map(|(score, member)| ScoredMember::new(member.clone(), *score))
                    .collect(),
                set.len(),
            ),
            None => (Vec::new(), 0),
        };
        inner.touch(key, start.min(len) + out.len() as u64);
        Ok(out)
    }

    async fn range_by_score(&self, key: &[u8], min: i64, max: i64) -> StoreResult<Vec<ScoredMember>> {
        let mut inner = self.lock()?;
        inner.check(&[key])?;
        if min > max {
            return Ok(Vec::new());
        }
        let mut out: Vec<ScoredMember> = match inner.sets.get(key) {
            Some(set) => set
                .ranked
                .range((min, Vec::new())..)
                .take_while(|(score, _)| *score <= max)
                .map(|(score, member)| ScoredMember::new(member.clone(), *score))
                .collect(),
            None => Vec::new(),
        };
        out.reverse();
        inner.touch(key, out.len() as u64);
        Ok(out)
    }

    async fn store_top(&self, dest: &[u8], src: &[u8], count: u64) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        inner.check(&[dest, src])?;
        let mut top = SortedSet::default();
        if let Some(set) = inner.sets.get(src) {
            for (score, member) in set.ranked.iter().rev().take(count as usize) {
                top.insert(member.clone(), *score);
            }
        }
        inner.touch(src, top.len());
        Ok(inner.replace(dest, top))
    }

    async fn store_diff(&self, dest: &[u8], src: &[u8], subtract: &[&[u8]]) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        let mut keys = vec![dest, src];
        keys.extend_from_slice(subtract);
        inner.check(&keys)?;
        let mut result = SortedSet::default();
        if let Some(set) = inner.sets.get(src) {
            for (score, member) in set.ranked.iter() {
                let removed = subtract.iter().any(|k| {
                    inner
                        .sets
                        .get(*k)
                        .map(|s| s.scores.contains_key(member))
                        .unwrap_or(false)
                });
                if !removed {
                    result.insert(member.clone(), *score);
                }
            }
        }
        let read = inner.sets.get(src).map(|s| s.len()).unwrap_or(0);
        inner.touch(src, read);
        Ok(inner.replace(dest, result))
    }

    async fn store_union(&self, dest: &[u8], sources: &[&[u8]], aggregate: Aggregate) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        let mut keys = vec![dest];
        keys.extend_from_slice(sources);
        inner.check(&keys)?;
        let mut combined: HashMap<Member, i64> = HashMap::new();
        let mut reads = Vec::with_capacity(sources.len());
        for src in sources {
            let Some(set) = inner.sets.get(*src) else { continue };
            for (member, score) in &set.scores {
                combined
                    .entry(member.clone())
                    .and_modify(|v| *v = aggregate.combine(*v, *score))
                    .or_insert(*score);
            }
            reads.push((src.to_vec(), set.len()));
        }
        for (src, n) in reads {
            inner.touch(&src, n);
        }
        let mut result = SortedSet::default();
        for (member, score) in combined {
            result.insert(member, score);
        }
        Ok(inner.replace(dest, result))
    }

    async fn delete(&self, keys: &[&[u8]]) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.check(keys)?;
        for key in keys {
            inner.sets.remove(*key);
        }
        Ok(())
    }

    async fn get_many(&self, keys: &[Vec<u8>]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        let inner = self.lock()?;
        let refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
        inner.check(&refs)?;
        Ok(keys.iter().map(|k| inner.records.get(k).cloned()).collect())
    }
}
