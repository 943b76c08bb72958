//! Locking-script classification.
//!
//! Token contracts carry their state as a fixed-layout data tail at the end of
//! the script, terminated by `version u32 LE ‖ type u32 LE ‖ "sensible"`. The
//! contract code is everything before the tail, so its hash identifies the
//! token contract independently of the state it currently holds.

use bitcoin::network::constants::Network;
use bitcoin::util::address::{Address, Payload};
use bitcoin::hashes::Hash;
use byteorder::{ByteOrder, LittleEndian};

use crate::types::{Hash160, HASH160_LEN, TXID_LEN};

pub const PROTO_FLAG: &[u8; 8] = b"sensible";

pub const TYPE_FT: u32 = 1;
pub const TYPE_NFT: u32 = 3;
pub const TYPE_NFT_SELL: u32 = 0x10001;

pub const FT_DATA_LEN: usize = 131;
pub const NFT_DATA_LEN: usize = 144;
pub const NFT_SELL_DATA_LEN: usize = 92;

const SENSIBLE_ID_LEN: usize = 36;
const FT_NAME_LEN: usize = 20;
const FT_SYMBOL_LEN: usize = 10;

/// Which layout a collection's members are expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptHint {
    Plain,
    Ft,
    Nft,
    NftSell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtAttributes {
    pub code_hash: Hash160,
    pub genesis: Hash160,
    pub sensible_id: Vec<u8>,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub address: Hash160,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftAttributes {
    pub code_hash: Hash160,
    pub genesis: Hash160,
    pub sensible_id: Vec<u8>,
    pub meta_txid: [u8; TXID_LEN],
    pub meta_vout: u32,
    pub address: Hash160,
    pub total_supply: u64,
    pub token_index: u64,
}

impl NftAttributes {
    /// Stable identity of one NFT across transfers: `hash160(genesis ‖ token_index LE)`.
    pub fn nft_id(&self) -> Hash160 {
        nft_id(&self.genesis, self.token_index)
    }
}

pub fn nft_id(genesis: &Hash160, token_index: u64) -> Hash160 {
    let mut buf = Vec::with_capacity(HASH160_LEN + 8);
    buf.extend_from_slice(&genesis.0);
    buf.extend_from_slice(&token_index.to_le_bytes());
    Hash160::digest(&buf)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftSellAttributes {
    pub code_hash: Hash160,
    /// Hash of the whole contract script; the NFT being sold is held by this address.
    pub contract_address: Hash160,
    pub seller: Hash160,
    pub price: u64,
    pub nft_code_hash: Hash160,
    pub nft_genesis: Hash160,
    pub token_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAttributes {
    /// Value-only output. `address` is absent for non-standard scripts.
    Plain { address: Option<Hash160> },
    Ft(FtAttributes),
    Nft(NftAttributes),
    NftSell(NftSellAttributes),
}

impl TokenAttributes {
    /// Owner of the output, if it has one.
    pub fn owner(&self) -> Option<Hash160> {
        match self {
            TokenAttributes::Plain { address } => *address,
            TokenAttributes::Ft(ft) => Some(ft.address),
            TokenAttributes::Nft(nft) => Some(nft.address),
            TokenAttributes::NftSell(sell) => Some(sell.seller),
        }
    }
}

pub trait ScriptClassifier: Send + Sync {
    fn classify(&self, script: &[u8], hint: ScriptHint) -> TokenAttributes;
}

/// Decodes the sensible FT, NFT and NFT-sell contract tails. Scripts that do
/// not carry the hinted layout classify as plain outputs.
#[derive(Debug, Clone, Copy)]
pub struct SensibleClassifier {
    network: Network,
}

impl SensibleClassifier {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    fn plain(&self, script: &[u8]) -> TokenAttributes {
        let script = bitcoin::Script::from(script.to_vec());
        let address = Address::from_script(&script, self.network).and_then(|a| match a.payload {
            Payload::PubkeyHash(pkh) => Some(Hash160(pkh.into_inner())),
            Payload::ScriptHash(sh) => Some(Hash160(sh.into_inner())),
            _ => None,
        });
        TokenAttributes::Plain { address }
    }
}

impl Default for SensibleClassifier {
    fn default() -> Self {
        Self::new(Network::Bitcoin)
    }
}

impl ScriptClassifier for SensibleClassifier {
    fn classify(&self, script: &[u8], hint: ScriptHint) -> TokenAttributes {
        let decoded = match hint {
            ScriptHint::Plain => None,
            ScriptHint::Ft => decode_ft(script).map(TokenAttributes::Ft),
            ScriptHint::Nft => decode_nft(script).map(TokenAttributes::Nft),
            ScriptHint::NftSell => decode_nft_sell(script).map(TokenAttributes::NftSell),
        };
        decoded.unwrap_or_else(|| self.plain(script))
    }
}

/// Splits `script` into (code, data) when it ends in a tail of `data_len`
/// bytes tagged with `proto_type`.
fn split_tail(script: &[u8], data_len: usize, proto_type: u32) -> Option<(&[u8], &[u8])> {
    if script.len() <= data_len {
        return None;
    }
    let (code, data) = script.split_at(script.len() - data_len);
    let flag_at = data_len - PROTO_FLAG.len();
    if &data[flag_at..] != PROTO_FLAG {
        return None;
    }
    if LittleEndian::read_u32(&data[flag_at - 4..flag_at]) != proto_type {
        return None;
    }
    Some((code, data))
}

/// Sequential reader over a validated tail.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        out
    }

    fn hash160(&mut self) -> Hash160 {
        let mut out = [0u8; HASH160_LEN];
        out.copy_from_slice(self.take(HASH160_LEN));
        Hash160(out)
    }

    fn u32(&mut self) -> u32 {
        LittleEndian::read_u32(self.take(4))
    }

    fn u64(&mut self) -> u64 {
        LittleEndian::read_u64(self.take(8))
    }

    fn text(&mut self, n: usize) -> String {
        let raw = self.take(n);
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }
}

pub fn decode_ft(script: &[u8]) -> Option<FtAttributes> {
    let (code, data) = split_tail(script, FT_DATA_LEN, TYPE_FT)?;
    let mut c = Cursor::new(data);
    let name = c.text(FT_NAME_LEN);
    let symbol = c.text(FT_SYMBOL_LEN);
    let decimals = c.take(1)[0];
    let address = c.hash160();
    let amount = c.u64();
    let genesis = c.hash160();
    let sensible_id = c.take(SENSIBLE_ID_LEN).to_vec();
    Some(FtAttributes {
        code_hash: Hash160::digest(code),
        genesis,
        sensible_id,
        name,
        symbol,
        decimals,
        address,
        amount,
    })
}

pub fn decode_nft(script: &[u8]) -> Option<NftAttributes> {
    let (code, data) = split_tail(script, NFT_DATA_LEN, TYPE_NFT)?;
    let mut c = Cursor::new(data);
    let mut meta_txid = [0u8; TXID_LEN];
    meta_txid.copy_from_slice(c.take(TXID_LEN));
    let meta_vout = c.u32();
    let address = c.hash160();
    let total_supply = c.u64();
    let token_index = c.u64();
    let genesis = c.hash160();
    let sensible_id = c.take(SENSIBLE_ID_LEN).to_vec();
    Some(NftAttributes {
        code_hash: Hash160::digest(code),
        genesis,
        sensible_id,
        meta_txid,
        meta_vout,
        address,
        total_supply,
        token_index,
    })
}

pub fn decode_nft_sell(script: &[u8]) -> Option<NftSellAttributes> {
    let (code, data) = split_tail(script, NFT_SELL_DATA_LEN, TYPE_NFT_SELL)?;
    let mut c = Cursor::new(data);
    let seller = c.hash160();
    let price = c.u64();
    let nft_code_hash = c.hash160();
    let nft_genesis = c.hash160();
    let token_index = c.u64();
    Some(NftSellAttributes {
        code_hash: Hash160::digest(code),
        contract_address: Hash160::digest(script),
        seller,
        price,
        nft_code_hash,
        nft_genesis,
        token_index,
    })
}
