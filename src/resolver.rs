//! Record resolution.
//!
//! A record is stored under its outpoint member as
//! `height u32 LE ‖ block_index u64 LE ‖ satoshi u64 LE ‖ script`.

use std::sync::Arc;
use std::time::Instant;

use byteorder::{ByteOrder, LittleEndian};
use tracing::warn;

use crate::classifier::{ScriptClassifier, ScriptHint, TokenAttributes};
use crate::error::{QueryError, Result};
use crate::metrics::RECORDS_DROPPED;
use crate::store::{within, Member, OrderedSetStore};
use crate::telemetry::short_hex;
use crate::types::{Outpoint, MEMPOOL_HEIGHT};

pub const RECORD_HEADER_LEN: usize = 4 + 8 + 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub outpoint: Outpoint,
    pub height: u32,
    pub block_index: u64,
    pub satoshi: u64,
    pub script: Vec<u8>,
    pub attributes: TokenAttributes,
}

impl Record {
    pub fn is_mempool(&self) -> bool {
        self.height == MEMPOOL_HEIGHT
    }

    /// Confirmations relative to `best_height`; mempool records have none.
    pub fn confirmations(&self, best_height: u32) -> u32 {
        if self.is_mempool() || self.height > best_height {
            return 0;
        }
        best_height - self.height + 1
    }
}

pub fn encode_record(height: u32, block_index: u64, satoshi: u64, script: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; RECORD_HEADER_LEN];
    LittleEndian::write_u32(&mut out[0..4], height);
    LittleEndian::write_u64(&mut out[4..12], block_index);
    LittleEndian::write_u64(&mut out[12..20], satoshi);
    out.extend_from_slice(script);
    out
}

/// Header fields and script of a raw record.
pub fn decode_record(bytes: &[u8]) -> Result<(u32, u64, u64, &[u8])> {
    if bytes.len() < RECORD_HEADER_LEN {
        return Err(QueryError::Decode(format!(
            "record too short: {} < {}",
            bytes.len(),
            RECORD_HEADER_LEN
        )));
    }
    Ok((
        LittleEndian::read_u32(&bytes[0..4]),
        LittleEndian::read_u64(&bytes[4..12]),
        LittleEndian::read_u64(&bytes[12..20]),
        &bytes[RECORD_HEADER_LEN..],
    ))
}

pub struct RecordResolver {
    store: Arc<dyn OrderedSetStore>,
    classifier: Arc<dyn ScriptClassifier>,
}

impl RecordResolver {
    pub fn new(store: Arc<dyn OrderedSetStore>, classifier: Arc<dyn ScriptClassifier>) -> Self {
        Self { store, classifier }
    }

    /// Fetches every member's record in one batched read. Members with a
    /// missing or malformed record are dropped; the output keeps input order.
    pub async fn resolve(&self, members: &[Member], hint: ScriptHint, deadline: Instant) -> Result<Vec<Record>> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let raw = within(deadline, "get_many", self.store.get_many(members)).await?;

        let mut records = Vec::with_capacity(members.len());
        for (member, value) in members.iter().zip(raw) {
            let Some(outpoint) = Outpoint::from_member(member) else {
                warn!(member = %short_hex(member), "listed member is not an outpoint");
                RECORDS_DROPPED.inc();
                continue;
            };
            let Some(bytes) = value else {
                warn!(outpoint = ?outpoint, "record missing, dropping entry");
                RECORDS_DROPPED.inc();
                continue;
            };
            match decode_record(&bytes) {
                Ok((height, block_index, satoshi, script)) => records.push(Record {
                    outpoint,
                    height,
                    block_index,
                    satoshi,
                    attributes: self.classifier.classify(script, hint),
                    script: script.to_vec(),
                }),
                Err(e) => {
                    warn!(outpoint = ?outpoint, error = %e, "undecodable record, dropping entry");
                    RECORDS_DROPPED.inc();
                }
            }
        }
        Ok(records)
    }
}
