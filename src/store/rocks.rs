//! RocksDB-backed ordered-set store.
//!
//! Layout (every collection name is length-prefixed so names never bleed into
//! each other):
//! - `zset_score`: `len(u16 BE) ‖ name ‖ member` → score (i64 BE)
//! - `zset_rank`:  `len(u16 BE) ‖ name ‖ sortable(score) ‖ member` → empty
//! - `zset_meta`:  `name` → cardinality (u64 LE)
//! - `records`:    record key → record bytes
//! - `chain_state`: `sync_height` → i32 LE, written by the indexer
//!
//! `store_*` results are written through one `WriteBatch`, so the destination
//! is replaced atomically. RocksDB calls block, so every operation runs on the
//! blocking pool.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};

use super::{rank_order, Aggregate, Member, OrderedSetStore, ScoredMember, StoreError, StoreResult};

pub const CF_SCORE: &str = "zset_score";
pub const CF_RANK: &str = "zset_rank";
pub const CF_META: &str = "zset_meta";
pub const CF_RECORDS: &str = "records";
pub const CF_CHAIN_STATE: &str = "chain_state";

pub const COLUMN_FAMILIES: [&str; 5] = [CF_SCORE, CF_RANK, CF_META, CF_RECORDS, CF_CHAIN_STATE];

pub struct RocksStore {
    db: Arc<DB>,
}

impl RocksStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut cf_descriptors = vec![ColumnFamilyDescriptor::new("default", Options::default())];
        for cf in COLUMN_FAMILIES.iter() {
            cf_descriptors.push(ColumnFamilyDescriptor::new(cf.to_string(), Options::default()));
        }
        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        db_options.create_missing_column_families(true);
        let db = DB::open_cf_descriptors(&db_options, path, cf_descriptors)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn db(&self) -> Arc<DB> {
        Arc::clone(&self.db)
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&DB) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    // ---- ingestion side (blocking) ------------------------------------------

    pub fn zadd(&self, key: &[u8], member: &[u8], score: i64) -> StoreResult<()> {
        let db = &self.db;
        let prefix = name_prefix(key)?;
        let cf_score = cf(db, CF_SCORE)?;
        let cf_rank = cf(db, CF_RANK)?;
        let cf_meta = cf(db, CF_META)?;

        let mut score_key = prefix.clone();
        score_key.extend_from_slice(member);

        let mut batch = WriteBatch::default();
        match db.get_cf(cf_score, &score_key)? {
            Some(old) => {
                let old = decode_score(&old)?;
                batch.delete_cf(cf_rank, rank_key(&prefix, old, member));
            }
            None => {
                let card = read_card(db, key)?;
                batch.put_cf(cf_meta, key, (card + 1).to_le_bytes());
            }
        }
        batch.put_cf(cf_score, &score_key, score.to_be_bytes());
        batch.put_cf(cf_rank, rank_key(&prefix, score, member), b"");
        db.write(batch)?;
        Ok(())
    }

    pub fn zrem(&self, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        let db = &self.db;
        let prefix = name_prefix(key)?;
        let cf_score = cf(db, CF_SCORE)?;
        let mut score_key = prefix.clone();
        score_key.extend_from_slice(member);

        let Some(old) = db.get_cf(cf_score, &score_key)? else {
            return Ok(false);
        };
        let old = decode_score(&old)?;
        let card = read_card(db, key)?;
        let mut batch = WriteBatch::default();
        batch.delete_cf(cf_score, &score_key);
        batch.delete_cf(cf(db, CF_RANK)?, rank_key(&prefix, old, member));
        if card <= 1 {
            batch.delete_cf(cf(db, CF_META)?, key);
        } else {
            batch.put_cf(cf(db, CF_META)?, key, (card - 1).to_le_bytes());
        }
        db.write(batch)?;
        Ok(true)
    }

    pub fn put_record(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.db.put_cf(cf(&self.db, CF_RECORDS)?, key, value)?;
        Ok(())
    }

    pub fn set_sync_height(&self, height: i32) -> StoreResult<()> {
        self.db
            .put_cf(cf(&self.db, CF_CHAIN_STATE)?, b"sync_height", height.to_le_bytes())?;
        Ok(())
    }
}

fn cf<'a>(db: &'a DB, name: &str) -> StoreResult<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| StoreError::Backend(format!("{} CF not found", name)))
}

fn name_prefix(key: &[u8]) -> StoreResult<Vec<u8>> {
    let len = u16::try_from(key.len())
        .map_err(|_| StoreError::Backend(format!("collection name too long: {} bytes", key.len())))?;
    let mut prefix = Vec::with_capacity(2 + key.len());
    prefix.extend_from_slice(&len.to_be_bytes());
    prefix.extend_from_slice(key);
    Ok(prefix)
}

/// Order-preserving encoding: flipping the sign bit makes i64 sort as u64 BE.
fn sortable(score: i64) -> [u8; 8] {
    ((score as u64) ^ (1u64 << 63)).to_be_bytes()
}

fn unsortable(bytes: &[u8]) -> StoreResult<i64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Backend("corrupt rank key".to_string()))?;
    Ok((u64::from_be_bytes(raw) ^ (1u64 << 63)) as i64)
}

fn decode_score(bytes: &[u8]) -> StoreResult<i64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Backend("corrupt score value".to_string()))?;
    Ok(i64::from_be_bytes(raw))
}

fn rank_key(prefix: &[u8], score: i64, member: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8 + member.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(&sortable(score));
    key.extend_from_slice(member);
    key
}

/// Smallest byte string greater than every string starting with `prefix`.
fn successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(last) = out.pop() {
        if last < 0xff {
            out.push(last + 1);
            return Some(out);
        }
    }
    None
}

fn read_card(db: &DB, key: &[u8]) -> StoreResult<u64> {
    match db.get_cf(cf(db, CF_META)?, key)? {
        Some(bytes) => {
            let raw: [u8; 8] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| StoreError::Backend("corrupt cardinality".to_string()))?;
            Ok(u64::from_le_bytes(raw))
        }
        None => Ok(0),
    }
}

/// Walks `key` in rank order, skipping `start`, yielding at most `count`.
fn read_rev(db: &DB, key: &[u8], start: u64, count: u64) -> StoreResult<Vec<ScoredMember>> {
    let prefix = name_prefix(key)?;
    let upper = successor(&prefix);
    let mode = match &upper {
        Some(upper) => IteratorMode::From(upper, Direction::Reverse),
        None => IteratorMode::End,
    };
    let mut out = Vec::new();
    let mut skipped = 0u64;
    for item in db.iterator_cf(cf(db, CF_RANK)?, mode) {
        if out.len() as u64 >= count {
            break;
        }
        let (k, _) = item?;
        if !k.starts_with(&prefix) {
            if k.as_ref() < prefix.as_slice() {
                break;
            }
            continue;
        }
        if skipped < start {
            skipped += 1;
            continue;
        }
        let tail = &k[prefix.len()..];
        if tail.len() < 8 {
            return Err(StoreError::Backend("corrupt rank key".to_string()));
        }
        out.push(ScoredMember::new(tail[8..].to_vec(), unsortable(&tail[..8])?));
    }
    Ok(out)
}

fn read_all(db: &DB, key: &[u8]) -> StoreResult<Vec<ScoredMember>> {
    let prefix = name_prefix(key)?;
    let mut out = Vec::new();
    for item in db.iterator_cf(cf(db, CF_SCORE)?, IteratorMode::From(&prefix, Direction::Forward)) {
        let (k, v) = item?;
        if !k.starts_with(&prefix) {
            break;
        }
        out.push(ScoredMember::new(k[prefix.len()..].to_vec(), decode_score(&v)?));
    }
    Ok(out)
}

/// Replaces `dest` with `entries` in one batch.
fn replace(db: &DB, dest: &[u8], entries: &[ScoredMember]) -> StoreResult<u64> {
    let prefix = name_prefix(dest)?;
    let cf_score = cf(db, CF_SCORE)?;
    let cf_rank = cf(db, CF_RANK)?;
    let cf_meta = cf(db, CF_META)?;

    let mut batch = WriteBatch::default();
    clear_into(db, &mut batch, dest, &prefix)?;
    for entry in entries {
        let mut score_key = prefix.clone();
        score_key.extend_from_slice(&entry.member);
        batch.put_cf(cf_score, score_key, entry.score.to_be_bytes());
        batch.put_cf(cf_rank, rank_key(&prefix, entry.score, &entry.member), b"");
    }
    if !entries.is_empty() {
        batch.put_cf(cf_meta, dest, (entries.len() as u64).to_le_bytes());
    }
    db.write(batch)?;
    Ok(entries.len() as u64)
}

fn clear_into(db: &DB, batch: &mut WriteBatch, key: &[u8], prefix: &[u8]) -> StoreResult<()> {
    let cf_score = cf(db, CF_SCORE)?;
    let cf_rank = cf(db, CF_RANK)?;
    match successor(prefix) {
        Some(upper) => {
            batch.delete_range_cf(cf_score, prefix, &upper);
            batch.delete_range_cf(cf_rank, prefix, &upper);
        }
        None => {
            for entry in read_all(db, key)? {
                let mut score_key = prefix.to_vec();
                score_key.extend_from_slice(&entry.member);
                batch.delete_cf(cf_score, score_key);
                batch.delete_cf(cf_rank, rank_key(prefix, entry.score, &entry.member));
            }
        }
    }
    batch.delete_cf(cf(db, CF_META)?, key);
    Ok(())
}

fn multi_score(db: &DB, key: &[u8], members: &[Member]) -> StoreResult<Vec<Option<i64>>> {
    let prefix = name_prefix(key)?;
    let cf_score = cf(db, CF_SCORE)?;
    let keys: Vec<Vec<u8>> = members
        .iter()
        .map(|m| {
            let mut k = prefix.clone();
            k.extend_from_slice(m);
            k
        })
        .collect();
    db.multi_get_cf(keys.iter().map(|k| (cf_score, k.as_slice())))
        .into_iter()
        .map(|r| match r? {
            Some(v) => decode_score(&v).map(Some),
            None => Ok(None),
        })
        .collect()
}

#[async_trait]
impl OrderedSetStore for RocksStore {
    async fn card(&self, key: &[u8]) -> StoreResult<u64> {
        let key = key.to_vec();
        self.run(move |db| read_card(db, &key)).await
    }

    async fn score(&self, key: &[u8], member: &[u8]) -> StoreResult<Option<i64>> {
        let key = key.to_vec();
        let members = vec![member.to_vec()];
        self.run(move |db| Ok(multi_score(db, &key, &members)?.pop().flatten()))
            .await
    }

    async fn scores(&self, key: &[u8], members: &[Member]) -> StoreResult<Vec<Option<i64>>> {
        let key = key.to_vec();
        let members = members.to_vec();
        self.run(move |db| multi_score(db, &key, &members)).await
    }

    async fn rev_range(&self, key: &[u8], start: u64, count: u64) -> StoreResult<Vec<ScoredMember>> {
        let key = key.to_vec();
        self.run(move |db| read_rev(db, &key, start, count)).await
    }

    async fn range_by_score(&self, key: &[u8], min: i64, max: i64) -> StoreResult<Vec<ScoredMember>> {
        let key = key.to_vec();
        self.run(move |db| {
            if min > max {
                return Ok(Vec::new());
            }
            let prefix = name_prefix(&key)?;
            let mut from = prefix.clone();
            from.extend_from_slice(&sortable(min));
            let mut out = Vec::new();
            for item in db.iterator_cf(cf(db, CF_RANK)?, IteratorMode::From(&from, Direction::Forward)) {
                let (k, _) = item?;
                if !k.starts_with(&prefix) || k.len() < prefix.len() + 8 {
                    break;
                }
                let tail = &k[prefix.len()..];
                let score = unsortable(&tail[..8])?;
                if score > max {
                    break;
                }
                out.push(ScoredMember::new(tail[8..].to_vec(), score));
            }
            out.reverse();
            Ok(out)
        })
        .await
    }

    async fn store_top(&self, dest: &[u8], src: &[u8], count: u64) -> StoreResult<u64> {
        let (dest, src) = (dest.to_vec(), src.to_vec());
        self.run(move |db| {
            let top = read_rev(db, &src, 0, count)?;
            replace(db, &dest, &top)
        })
        .await
    }

    async fn store_diff(&self, dest: &[u8], src: &[u8], subtract: &[&[u8]]) -> StoreResult<u64> {
        let (dest, src) = (dest.to_vec(), src.to_vec());
        let subtract: Vec<Vec<u8>> = subtract.iter().map(|k| k.to_vec()).collect();
        self.run(move |db| {
            let entries = read_all(db, &src)?;
            let members: Vec<Member> = entries.iter().map(|e| e.member.clone()).collect();
            let mut keep = vec![true; entries.len()];
            for key in &subtract {
                for (i, hit) in multi_score(db, key, &members)?.into_iter().enumerate() {
                    if hit.is_some() {
                        keep[i] = false;
                    }
                }
            }
            let kept: Vec<ScoredMember> = entries
                .into_iter()
                .zip(keep)
                .filter_map(|(e, k)| k.then_some(e))
                .collect();
            replace(db, &dest, &kept)
        })
        .await
    }

    async fn store_union(&self, dest: &[u8], sources: &[&[u8]], aggregate: Aggregate) -> StoreResult<u64> {
        let dest = dest.to_vec();
        let sources: Vec<Vec<u8>> = sources.iter().map(|k| k.to_vec()).collect();
        self.run(move |db| {
            let mut combined: HashMap<Member, i64> = HashMap::new();
            for src in &sources {
                for entry in read_all(db, src)? {
                    combined
                        .entry(entry.member)
                        .and_modify(|v| *v = aggregate.combine(*v, entry.score))
                        .or_insert(entry.score);
                }
            }
            let mut entries: Vec<ScoredMember> = combined
                .into_iter()
                .map(|(member, score)| ScoredMember { member, score })
                .collect();
            entries.sort_by(rank_order);
            replace(db, &dest, &entries)
        })
        .await
    }

    async fn delete(&self, keys: &[&[u8]]) -> StoreResult<()> {
        let keys: Vec<Vec<u8>> = keys.iter().map(|k| k.to_vec()).collect();
        self.run(move |db| {
            let mut batch = WriteBatch::default();
            for key in &keys {
                let prefix = name_prefix(key)?;
                clear_into(db, &mut batch, key, &prefix)?;
            }
            db.write(batch)?;
            Ok(())
        })
        .await
    }

    async fn get_many(&self, keys: &[Vec<u8>]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        let keys = keys.to_vec();
        self.run(move |db| {
            let cf_records = cf(db, CF_RECORDS)?;
            db.multi_get_cf(keys.iter().map(|k| (cf_records, k.as_slice())))
                .into_iter()
                .map(|r| r.map_err(StoreError::from))
                .collect()
        })
        .await
    }
}
