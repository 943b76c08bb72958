//! Fixed-width chain identifiers shared by the key scheme, the resolver and
//! the API layer.

use std::fmt;
use std::str::FromStr;

use bitcoin::hashes::Hash;
use bitcoin::network::constants::Network;
use bitcoin::util::address::{Address, Payload};
use bitcoin::{PubkeyHash, ScriptHash};
use ripemd160::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::QueryError;

pub const HASH160_LEN: usize = 20;
pub const TXID_LEN: usize = 32;
pub const OUTPOINT_LEN: usize = TXID_LEN + 4;

/// Height carried by records that only exist in the mempool.
pub const MEMPOOL_HEIGHT: u32 = u32::MAX;

/// A 20-byte hash: address payloads, contract code hashes, genesis ids and
/// NFT ids all share this width.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash160(pub [u8; HASH160_LEN]);

impl Hash160 {
    /// sha256 followed by ripemd160.
    pub fn digest(data: &[u8]) -> Self {
        let sha = Sha256::digest(data);
        let rmd = Ripemd160::digest(&sha);
        let mut out = [0u8; HASH160_LEN];
        out.copy_from_slice(&rmd);
        Hash160(out)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != HASH160_LEN {
            return None;
        }
        let mut out = [0u8; HASH160_LEN];
        out.copy_from_slice(bytes);
        Some(Hash160(out))
    }

    /// Parses the hex form used in URLs for code hashes, genesis ids and NFT ids.
    pub fn from_hex(s: &str) -> Result<Self, QueryError> {
        let bytes = hex::decode(s).map_err(|_| QueryError::invalid(format!("not hex: {}", s)))?;
        Self::from_slice(&bytes)
            .ok_or_else(|| QueryError::invalid(format!("expected {} bytes: {}", HASH160_LEN, s)))
    }

    /// Parses a base58 P2PKH/P2SH address into its hash payload.
    pub fn from_address(s: &str) -> Result<Self, QueryError> {
        let address =
            Address::from_str(s).map_err(|e| QueryError::invalid(format!("bad address {}: {}", s, e)))?;
        match address.payload {
            Payload::PubkeyHash(pkh) => Ok(Hash160(pkh.into_inner())),
            Payload::ScriptHash(sh) => Ok(Hash160(sh.into_inner())),
            _ => Err(QueryError::invalid(format!("unsupported address type: {}", s))),
        }
    }

    /// Renders the hash as a P2PKH address for `network`.
    pub fn to_address(&self, network: Network) -> String {
        Address {
            network,
            payload: Payload::PubkeyHash(PubkeyHash::from_inner(self.0)),
        }
        .to_string()
    }

    /// Renders the hash as a P2SH address for `network`.
    pub fn to_script_address(&self, network: Network) -> String {
        Address {
            network,
            payload: Payload::ScriptHash(ScriptHash::from_inner(self.0)),
        }
        .to_string()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash160({})", self.to_hex())
    }
}

impl fmt::Display for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Transaction output reference. `txid` is kept in internal byte order; the
/// display form is reversed like every explorer does.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Outpoint {
    pub txid: [u8; TXID_LEN],
    pub vout: u32,
}

impl Outpoint {
    pub fn new(txid: [u8; TXID_LEN], vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Member encoding: `txid(32) ‖ vout(u32 LE)`.
    pub fn to_member(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(OUTPOINT_LEN);
        out.extend_from_slice(&self.txid);
        out.extend_from_slice(&self.vout.to_le_bytes());
        out
    }

    pub fn from_member(member: &[u8]) -> Option<Self> {
        if member.len() != OUTPOINT_LEN {
            return None;
        }
        let mut txid = [0u8; TXID_LEN];
        txid.copy_from_slice(&member[..TXID_LEN]);
        let vout = u32::from_le_bytes(member[TXID_LEN..].try_into().ok()?);
        Some(Self { txid, vout })
    }

    pub fn txid_hex(&self) -> String {
        let mut display = self.txid;
        display.reverse();
        hex::encode(display)
    }
}

impl fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid_hex(), self.vout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outpoint_member_layout() {
        let mut txid = [0u8; 32];
        txid[0] = 0xab;
        txid[31] = 0x01;
        let op = Outpoint::new(txid, 7);
        let member = op.to_member();
        assert_eq!(member.len(), OUTPOINT_LEN);
        assert_eq!(&member[32..], &7u32.to_le_bytes());
        assert_eq!(Outpoint::from_member(&member), Some(op));
        assert!(op.txid_hex().starts_with("01"));
        assert!(op.txid_hex().ends_with("ab"));
        assert_eq!(Outpoint::from_member(&member[..35]), None);
    }

    #[test]
    fn test_hash160_address_round() {
        let h = Hash160([7u8; 20]);
        let addr = h.to_address(Network::Bitcoin);
        assert!(addr.starts_with('1'));
        assert_eq!(Hash160::from_address(&addr).unwrap(), h);
    }

    #[test]
    fn test_hash160_hex_rejects_wrong_width() {
        assert!(Hash160::from_hex("abcd").is_err());
        assert!(Hash160::from_hex("zz").is_err());
        let h = Hash160::from_hex(&"11".repeat(20)).unwrap();
        assert_eq!(h.0, [0x11; 20]);
    }

    #[test]
    fn test_hash160_digest_known_vector() {
        // hash160 of the empty string
        assert_eq!(
            Hash160::digest(b"").to_hex(),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }
}
