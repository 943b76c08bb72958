// API Type Definitions
//
// All serializable types used by API endpoints. Hashes are lowercase hex,
// txids are in display (reversed) order, addresses are base58.

use serde::{Deserialize, Serialize};

use crate::reconcile::Page;

// ========== Query Types ==========

/// `?cursor=&size=`; a missing size falls back to the configured default.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PageQuery {
    #[serde(default)]
    pub cursor: i64,
    pub size: Option<i64>,
}

// ========== Counters ==========

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCounts {
    pub total: i64,
    #[serde(rename = "totalConfirmed")]
    pub total_confirmed: u64,
    #[serde(rename = "totalUnconfirmedNew")]
    pub total_unconfirmed_new: u64,
    #[serde(rename = "totalUnconfirmedSpend")]
    pub total_unconfirmed_spend: u64,
}

impl From<&Page> for PageCounts {
    fn from(page: &Page) -> Self {
        PageCounts {
            total: page.total,
            total_confirmed: page.total_confirmed,
            total_unconfirmed_new: page.total_pending_add,
            total_unconfirmed_spend: page.total_pending_remove,
        }
    }
}

/// Items of one page plus the view counters (the `-data` endpoints).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Listing<T> {
    #[serde(flatten)]
    pub counts: PageCounts,
    pub utxo: Vec<T>,
}

/// One page of a ranked aggregate index.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Ranked<T> {
    pub total: u64,
    pub list: Vec<T>,
}

// ========== Chain Types ==========

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HeightInfo {
    pub height: u32,
}

// ========== Balance Types ==========

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BalanceInfo {
    pub address: String,
    /// Settled part of the balance.
    pub balance: i64,
    #[serde(rename = "pendingBalance")]
    pub pending_balance: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FtBalanceInfo {
    #[serde(rename = "codeHash")]
    pub code_hash: String,
    pub genesis: String,
    pub address: String,
    pub balance: i64,
    #[serde(rename = "pendingBalance")]
    pub pending_balance: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FtSummaryEntry {
    #[serde(rename = "codeHash")]
    pub code_hash: String,
    pub genesis: String,
    pub name: String,
    pub symbol: String,
    pub decimal: u8,
    pub balance: i64,
    #[serde(rename = "pendingBalance")]
    pub pending_balance: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NftOwnerEntry {
    pub address: String,
    pub count: i64,
    #[serde(rename = "pendingCount")]
    pub pending_count: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NftSummaryEntry {
    #[serde(rename = "codeHash")]
    pub code_hash: String,
    pub genesis: String,
    pub name: String,
    pub symbol: String,
    pub count: i64,
    #[serde(rename = "pendingCount")]
    pub pending_count: i64,
}

// ========== UTXO Types ==========

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UtxoItem {
    pub txid: String,
    pub vout: u32,
    pub satoshi: u64,
    pub height: u32,
    pub confirmations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FtUtxoItem {
    pub txid: String,
    pub vout: u32,
    pub satoshi: u64,
    pub height: u32,
    pub confirmations: u32,
    #[serde(rename = "codeHash")]
    pub code_hash: String,
    pub genesis: String,
    #[serde(rename = "sensibleId")]
    pub sensible_id: String,
    #[serde(rename = "tokenName")]
    pub token_name: String,
    #[serde(rename = "tokenSymbol")]
    pub token_symbol: String,
    pub decimal: u8,
    #[serde(rename = "tokenAmount")]
    pub token_amount: u64,
    pub address: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NftUtxoItem {
    pub txid: String,
    pub vout: u32,
    pub satoshi: u64,
    pub height: u32,
    pub confirmations: u32,
    #[serde(rename = "codeHash")]
    pub code_hash: String,
    pub genesis: String,
    #[serde(rename = "sensibleId")]
    pub sensible_id: String,
    #[serde(rename = "nftId")]
    pub nft_id: String,
    #[serde(rename = "tokenIndex")]
    pub token_index: u64,
    #[serde(rename = "tokenSupply")]
    pub token_supply: u64,
    #[serde(rename = "metaTxId")]
    pub meta_txid: String,
    #[serde(rename = "metaOutputIndex")]
    pub meta_output_index: u32,
    pub address: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NftSellItem {
    pub txid: String,
    pub vout: u32,
    pub satoshi: u64,
    pub height: u32,
    pub confirmations: u32,
    #[serde(rename = "codeHash")]
    pub code_hash: String,
    pub genesis: String,
    #[serde(rename = "tokenIndex")]
    pub token_index: u64,
    pub price: u64,
    pub address: String,
    #[serde(rename = "isReady")]
    pub is_ready: bool,
}

// ========== Error Types ==========

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiError {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        ApiError {
            error: ErrorDetail {
                message: message.into(),
            },
        }
    }
}
