//! Response assembly.
//!
//! One method per query family: reconcile the scope, resolve the page's
//! records, then project them into the public shapes of `api::types`. Token
//! display metadata and listing readiness are joined in here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bitcoin::network::constants::Network;
use futures::future::join_all;
use tracing::warn;

use crate::api::types::{
    BalanceInfo, FtBalanceInfo, FtSummaryEntry, FtUtxoItem, Listing, NftOwnerEntry, NftSellItem,
    NftSummaryEntry, NftUtxoItem, PageCounts, Ranked, UtxoItem,
};
use crate::chain_state::ChainTip;
use crate::classifier::{NftSellAttributes, ScriptClassifier, ScriptHint, TokenAttributes};
use crate::config::Settings;
use crate::error::{QueryError, Result};
use crate::keys::{split_token_member, token_info_key, Family, Scope};
use crate::metrics::{ENRICHMENT_FAILURES, RECORDS_DROPPED};
use crate::reconcile::{AggregateEntry, AggregateReconciler, Page, ViewReconciler};
use crate::resolver::{Record, RecordResolver};
use crate::store::{within, OrderedSetStore};
use crate::types::Hash160;

/// Display metadata of a token, stored under `keys::token_info_key` as
/// `decimals u8 ‖ name_len u8 ‖ name ‖ symbol_len u8 ‖ symbol`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenInfo {
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
}

impl TokenInfo {
    pub fn encode(&self) -> Vec<u8> {
        let name = &self.name.as_bytes()[..self.name.len().min(u8::MAX as usize)];
        let symbol = &self.symbol.as_bytes()[..self.symbol.len().min(u8::MAX as usize)];
        let mut out = Vec::with_capacity(3 + name.len() + symbol.len());
        out.push(self.decimals);
        out.push(name.len() as u8);
        out.extend_from_slice(name);
        out.push(symbol.len() as u8);
        out.extend_from_slice(symbol);
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (&decimals, rest) = bytes.split_first()?;
        let (&name_len, rest) = rest.split_first()?;
        let name = rest.get(..name_len as usize)?;
        let rest = &rest[name_len as usize..];
        let (&symbol_len, rest) = rest.split_first()?;
        let symbol = rest.get(..symbol_len as usize)?;
        Some(TokenInfo {
            decimals,
            name: String::from_utf8_lossy(name).into_owned(),
            symbol: String::from_utf8_lossy(symbol).into_owned(),
        })
    }
}

/// Classification hint for the records listed by a family.
pub fn hint_for(family: Family) -> ScriptHint {
    match family {
        Family::FtUtxo => ScriptHint::Ft,
        Family::NftUtxo | Family::NftToken | Family::NftById => ScriptHint::Nft,
        Family::SellByToken | Family::SellByAddress => ScriptHint::NftSell,
        _ => ScriptHint::Plain,
    }
}

pub struct Assembler {
    view: ViewReconciler,
    aggregates: AggregateReconciler,
    resolver: RecordResolver,
    store: Arc<dyn OrderedSetStore>,
    tip: Arc<dyn ChainTip>,
    network: Network,
    timeout: Duration,
    default_page_size: u64,
}

impl Assembler {
    pub fn new(
        store: Arc<dyn OrderedSetStore>,
        classifier: Arc<dyn ScriptClassifier>,
        tip: Arc<dyn ChainTip>,
        settings: &Settings,
    ) -> Self {
        Self {
            view: ViewReconciler::new(store.clone(), settings.max_page_size),
            aggregates: AggregateReconciler::new(store.clone(), settings.max_page_size),
            resolver: RecordResolver::new(store.clone(), classifier),
            store,
            tip,
            network: settings.network,
            timeout: settings.store_timeout,
            default_page_size: settings.default_page_size,
        }
    }

    pub fn default_page_size(&self) -> u64 {
        self.default_page_size
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    fn address(&self, hash: &Hash160) -> String {
        hash.to_address(self.network)
    }

    pub async fn best_height(&self) -> Result<u32> {
        Ok(within(self.deadline(), "best_height", self.tip.best_height()).await?)
    }

    /// Page of a member-list family plus its records.
    async fn page_records(
        &self,
        family: Family,
        scope: &Scope,
        cursor: i64,
        size: i64,
        deadline: Instant,
    ) -> Result<(Page, Vec<Record>, u32)> {
        let page = self.view.get_page(&family, scope, cursor, size, deadline).await?;
        let records = self.resolver.resolve(&page.members, hint_for(family), deadline).await?;
        let best = within(deadline, "best_height", self.tip.best_height()).await?;
        Ok((page, records, best))
    }

    async fn index_records(
        &self,
        family: Family,
        scope: &Scope,
        token_index: u64,
        deadline: Instant,
    ) -> Result<(Vec<Record>, u32)> {
        let index = i64::try_from(token_index)
            .map_err(|_| QueryError::invalid(format!("token index out of range: {}", token_index)))?;
        let members = self.view.find_by_index(&family, scope, index, deadline).await?;
        let records = self.resolver.resolve(&members, hint_for(family), deadline).await?;
        let best = within(deadline, "best_height", self.tip.best_height()).await?;
        Ok((records, best))
    }

    // ---- plain ----------------------------------------------------------

    pub async fn address_balance(&self, address: Hash160) -> Result<BalanceInfo> {
        let value = self
            .aggregates
            .get_aggregate(&Family::PlainBalance, &Scope::All, &address.0, self.deadline())
            .await?;
        Ok(BalanceInfo {
            address: self.address(&address),
            balance: value.settled(),
            pending_balance: value.pending_delta,
        })
    }

    pub async fn rich_list(&self, cursor: i64, size: i64) -> Result<Ranked<BalanceInfo>> {
        let top = self
            .aggregates
            .get_top_aggregates(&Family::PlainBalance, &Scope::All, cursor, size, self.deadline())
            .await?;
        let list = top
            .entries
            .iter()
            .filter_map(|e| {
                let address = Hash160::from_slice(&e.member)?;
                Some(BalanceInfo {
                    address: self.address(&address),
                    balance: settled(e),
                    pending_balance: e.pending_delta,
                })
            })
            .collect();
        Ok(Ranked { total: top.total, list })
    }

    pub async fn address_utxos(&self, address: Hash160, cursor: i64, size: i64) -> Result<Listing<UtxoItem>> {
        let deadline = self.deadline();
        let (page, records, best) = self
            .page_records(Family::AddressUtxo, &Scope::Address(address), cursor, size, deadline)
            .await?;
        let utxo = records
            .iter()
            .map(|r| UtxoItem {
                txid: r.outpoint.txid_hex(),
                vout: r.outpoint.vout,
                satoshi: r.satoshi,
                height: r.height,
                confirmations: r.confirmations(best),
                address: r.attributes.owner().map(|a| self.address(&a)),
            })
            .collect();
        Ok(Listing { counts: PageCounts::from(&page), utxo })
    }

    // ---- fungible tokens ------------------------------------------------

    pub async fn ft_utxos(
        &self,
        code_hash: Hash160,
        genesis: Hash160,
        address: Hash160,
        cursor: i64,
        size: i64,
    ) -> Result<Listing<FtUtxoItem>> {
        let deadline = self.deadline();
        let scope = Scope::TokenOwner { code_hash, genesis, address };
        let (page, records, best) = self.page_records(Family::FtUtxo, &scope, cursor, size, deadline).await?;
        let utxo = records.iter().filter_map(|r| self.ft_item(r, best)).collect();
        Ok(Listing { counts: PageCounts::from(&page), utxo })
    }

    fn ft_item(&self, record: &Record, best: u32) -> Option<FtUtxoItem> {
        let TokenAttributes::Ft(ft) = &record.attributes else {
            mismatched(record, "ft");
            return None;
        };
        Some(FtUtxoItem {
            txid: record.outpoint.txid_hex(),
            vout: record.outpoint.vout,
            satoshi: record.satoshi,
            height: record.height,
            confirmations: record.confirmations(best),
            code_hash: ft.code_hash.to_hex(),
            genesis: ft.genesis.to_hex(),
            sensible_id: hex::encode(&ft.sensible_id),
            token_name: ft.name.clone(),
            token_symbol: ft.symbol.clone(),
            decimal: ft.decimals,
            token_amount: ft.amount,
            address: self.address(&ft.address),
        })
    }

    pub async fn ft_balance(&self, code_hash: Hash160, genesis: Hash160, address: Hash160) -> Result<FtBalanceInfo> {
        let value = self
            .aggregates
            .get_aggregate(&Family::FtHolders, &Scope::Token { code_hash, genesis }, &address.0, self.deadline())
            .await?;
        Ok(FtBalanceInfo {
            code_hash: code_hash.to_hex(),
            genesis: genesis.to_hex(),
            address: self.address(&address),
            balance: value.settled(),
            pending_balance: value.pending_delta,
        })
    }

    pub async fn ft_owners(
        &self,
        code_hash: Hash160,
        genesis: Hash160,
        cursor: i64,
        size: i64,
    ) -> Result<Ranked<BalanceInfo>> {
        let top = self
            .aggregates
            .get_top_aggregates(&Family::FtHolders, &Scope::Token { code_hash, genesis }, cursor, size, self.deadline())
            .await?;
        let list = top
            .entries
            .iter()
            .filter_map(|e| {
                let address = Hash160::from_slice(&e.member)?;
                Some(BalanceInfo {
                    address: self.address(&address),
                    balance: settled(e),
                    pending_balance: e.pending_delta,
                })
            })
            .collect();
        Ok(Ranked { total: top.total, list })
    }

    pub async fn ft_summary(&self, address: Hash160, cursor: i64, size: i64) -> Result<Ranked<FtSummaryEntry>> {
        let deadline = self.deadline();
        let top = self
            .aggregates
            .get_top_aggregates(&Family::FtSummary, &Scope::Address(address), cursor, size, deadline)
            .await?;
        let tokens = self.token_infos(&top.entries, deadline).await?;
        let list = tokens
            .into_iter()
            .map(|(code_hash, genesis, info, entry)| FtSummaryEntry {
                code_hash: code_hash.to_hex(),
                genesis: genesis.to_hex(),
                name: info.name,
                symbol: info.symbol,
                decimal: info.decimals,
                balance: settled(entry),
                pending_balance: entry.pending_delta,
            })
            .collect();
        Ok(Ranked { total: top.total, list })
    }

    /// Joins token display metadata onto `codeHash ‖ genesis` members with
    /// one batched read. Missing metadata renders as empty.
    async fn token_infos<'a>(
        &self,
        entries: &'a [AggregateEntry],
        deadline: Instant,
    ) -> Result<Vec<(Hash160, Hash160, TokenInfo, &'a AggregateEntry)>> {
        let tokens: Vec<(Hash160, Hash160, &AggregateEntry)> = entries
            .iter()
            .filter_map(|e| {
                let (code_hash, genesis) = split_token_member(&e.member)?;
                Some((code_hash, genesis, e))
            })
            .collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<Vec<u8>> = tokens.iter().map(|(c, g, _)| token_info_key(c, g)).collect();
        let raw = within(deadline, "get_many", self.store.get_many(&keys)).await?;
        Ok(tokens
            .into_iter()
            .zip(raw)
            .map(|((code_hash, genesis, entry), bytes)| {
                let info = bytes.as_deref().and_then(TokenInfo::decode).unwrap_or_default();
                (code_hash, genesis, info, entry)
            })
            .collect())
    }

    // ---- non-fungible tokens --------------------------------------------

    fn nft_item(&self, record: &Record, best: u32) -> Option<NftUtxoItem> {
        let TokenAttributes::Nft(nft) = &record.attributes else {
            mismatched(record, "nft");
            return None;
        };
        Some(NftUtxoItem {
            txid: record.outpoint.txid_hex(),
            vout: record.outpoint.vout,
            satoshi: record.satoshi,
            height: record.height,
            confirmations: record.confirmations(best),
            code_hash: nft.code_hash.to_hex(),
            genesis: nft.genesis.to_hex(),
            sensible_id: hex::encode(&nft.sensible_id),
            nft_id: nft.nft_id().to_hex(),
            token_index: nft.token_index,
            token_supply: nft.total_supply,
            meta_txid: hex::encode(nft.meta_txid.iter().rev().copied().collect::<Vec<u8>>()),
            meta_output_index: nft.meta_vout,
            address: self.address(&nft.address),
        })
    }

    pub async fn nft_utxos(
        &self,
        code_hash: Hash160,
        genesis: Hash160,
        address: Hash160,
        cursor: i64,
        size: i64,
    ) -> Result<Listing<NftUtxoItem>> {
        let deadline = self.deadline();
        let scope = Scope::TokenOwner { code_hash, genesis, address };
        let (page, records, best) = self.page_records(Family::NftUtxo, &scope, cursor, size, deadline).await?;
        let utxo = records.iter().filter_map(|r| self.nft_item(r, best)).collect();
        Ok(Listing { counts: PageCounts::from(&page), utxo })
    }

    /// The UTXO currently holding one NFT.
    pub async fn nft_utxo_by_id(&self, code_hash: Hash160, nft_id: Hash160) -> Result<NftUtxoItem> {
        let deadline = self.deadline();
        let scope = Scope::Nft { code_hash, nft_id };
        let (_, records, best) = self.page_records(Family::NftById, &scope, 0, 1, deadline).await?;
        records
            .iter()
            .find_map(|r| self.nft_item(r, best))
            .ok_or_else(|| QueryError::not_found(format!("nft {}", nft_id)))
    }

    pub async fn nft_utxo_detail(
        &self,
        code_hash: Hash160,
        genesis: Hash160,
        token_index: u64,
    ) -> Result<Vec<NftUtxoItem>> {
        let deadline = self.deadline();
        let (records, best) = self
            .index_records(Family::NftToken, &Scope::Token { code_hash, genesis }, token_index, deadline)
            .await?;
        Ok(records.iter().filter_map(|r| self.nft_item(r, best)).collect())
    }

    pub async fn nft_owners(
        &self,
        code_hash: Hash160,
        genesis: Hash160,
        cursor: i64,
        size: i64,
    ) -> Result<Ranked<NftOwnerEntry>> {
        let top = self
            .aggregates
            .get_top_aggregates(&Family::NftHolders, &Scope::Token { code_hash, genesis }, cursor, size, self.deadline())
            .await?;
        let list = top
            .entries
            .iter()
            .filter_map(|e| {
                let address = Hash160::from_slice(&e.member)?;
                Some(NftOwnerEntry {
                    address: self.address(&address),
                    count: settled(e),
                    pending_count: e.pending_delta,
                })
            })
            .collect();
        Ok(Ranked { total: top.total, list })
    }

    pub async fn nft_summary(&self, address: Hash160, cursor: i64, size: i64) -> Result<Ranked<NftSummaryEntry>> {
        let deadline = self.deadline();
        let top = self
            .aggregates
            .get_top_aggregates(&Family::NftSummary, &Scope::Address(address), cursor, size, deadline)
            .await?;
        let tokens = self.token_infos(&top.entries, deadline).await?;
        let list = tokens
            .into_iter()
            .map(|(code_hash, genesis, info, entry)| NftSummaryEntry {
                code_hash: code_hash.to_hex(),
                genesis: genesis.to_hex(),
                name: info.name,
                symbol: info.symbol,
                count: settled(entry),
                pending_count: entry.pending_delta,
            })
            .collect();
        Ok(Ranked { total: top.total, list })
    }

    // ---- marketplace listings -------------------------------------------

    pub async fn sell_utxos(
        &self,
        code_hash: Hash160,
        genesis: Hash160,
        cursor: i64,
        size: i64,
    ) -> Result<Listing<NftSellItem>> {
        let deadline = self.deadline();
        let scope = Scope::Token { code_hash, genesis };
        let (page, records, best) = self.page_records(Family::SellByToken, &scope, cursor, size, deadline).await?;
        let utxo = self.sell_items(&records, best, deadline).await;
        Ok(Listing { counts: PageCounts::from(&page), utxo })
    }

    pub async fn sell_utxos_by_address(&self, address: Hash160, cursor: i64, size: i64) -> Result<Listing<NftSellItem>> {
        let deadline = self.deadline();
        let (page, records, best) = self
            .page_records(Family::SellByAddress, &Scope::Address(address), cursor, size, deadline)
            .await?;
        let utxo = self.sell_items(&records, best, deadline).await;
        Ok(Listing { counts: PageCounts::from(&page), utxo })
    }

    pub async fn sell_utxo_detail(
        &self,
        code_hash: Hash160,
        genesis: Hash160,
        token_index: u64,
    ) -> Result<Vec<NftSellItem>> {
        let deadline = self.deadline();
        let (records, best) = self
            .index_records(Family::SellByToken, &Scope::Token { code_hash, genesis }, token_index, deadline)
            .await?;
        Ok(self.sell_items(&records, best, deadline).await)
    }

    /// Readiness lookups for the page run concurrently.
    async fn sell_items(&self, records: &[Record], best: u32, deadline: Instant) -> Vec<NftSellItem> {
        let listings: Vec<(&Record, &NftSellAttributes)> = records
            .iter()
            .filter_map(|record| match &record.attributes {
                TokenAttributes::NftSell(sell) => Some((record, sell)),
                _ => {
                    mismatched(record, "nft sell");
                    None
                }
            })
            .collect();
        let ready = join_all(listings.iter().map(|(_, sell)| {
            self.is_ready(&sell.nft_code_hash, &sell.nft_genesis, &sell.contract_address, deadline)
        }))
        .await;

        listings
            .into_iter()
            .zip(ready)
            .map(|((record, sell), is_ready)| NftSellItem {
                txid: record.outpoint.txid_hex(),
                vout: record.outpoint.vout,
                satoshi: record.satoshi,
                height: record.height,
                confirmations: record.confirmations(best),
                code_hash: sell.nft_code_hash.to_hex(),
                genesis: sell.nft_genesis.to_hex(),
                token_index: sell.token_index,
                price: sell.price,
                address: self.address(&sell.seller),
                is_ready,
            })
            .collect()
    }

    /// Whether the sell contract currently holds the NFT, counting pending
    /// transfers. Any failure reads as not ready.
    async fn is_ready(&self, code_hash: &Hash160, genesis: &Hash160, contract: &Hash160, deadline: Instant) -> bool {
        let scope = Scope::Token { code_hash: *code_hash, genesis: *genesis };
        match self
            .aggregates
            .get_aggregate(&Family::NftHolders, &scope, &contract.0, deadline)
            .await
        {
            Ok(value) => value.confirmed_value > 0,
            Err(e) => {
                warn!(contract = %contract, error = %e, "is_ready lookup failed, reporting not ready");
                ENRICHMENT_FAILURES.inc();
                false
            }
        }
    }
}

fn settled(entry: &AggregateEntry) -> i64 {
    entry.value - entry.pending_delta
}

fn mismatched(record: &Record, expected: &str) {
    warn!(outpoint = ?record.outpoint, expected, "record does not carry the expected token layout");
    RECORDS_DROPPED.inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_state::FixedTip;
    use crate::classifier::tests::{nft_script, sell_script};
    use crate::classifier::SensibleClassifier;
    use crate::keys::{token_member, Role, ScopeKeyScheme};
    use crate::resolver::encode_record;
    use crate::store::MemoryStore;
    use crate::types::{Outpoint, MEMPOOL_HEIGHT};

    fn assembler(store: Arc<MemoryStore>, best: u32) -> Assembler {
        Assembler::new(
            store,
            Arc::new(SensibleClassifier::default()),
            Arc::new(FixedTip::new(best)),
            &Settings::default(),
        )
    }

    #[test]
    fn test_token_info_codec() {
        let info = TokenInfo { decimals: 8, name: "Space".to_string(), symbol: "SPC".to_string() };
        assert_eq!(TokenInfo::decode(&info.encode()), Some(info));
        assert_eq!(TokenInfo::decode(&[8, 5, b'a']), None);
        assert_eq!(TokenInfo::decode(&[]), None);
    }

    #[tokio::test]
    async fn test_sell_listing_is_ready_enrichment() {
        let store = Arc::new(MemoryStore::new());
        let nft_code = Hash160::digest(&[0x51, 0x52, 0x53, 0x75]);
        let genesis = Hash160([4; 20]);
        let seller = Hash160([5; 20]);
        let scope = Scope::Token { code_hash: nft_code, genesis };

        let ready_script = sell_script(seller, 1000, genesis, 1);
        let stale_script = sell_script(seller, 2000, genesis, 2);
        let ready = Outpoint::new([1; 32], 0).to_member();
        let stale = Outpoint::new([2; 32], 0).to_member();
        store.put_record(&ready, &encode_record(100, 0, 546, &ready_script)).unwrap();
        store.put_record(&stale, &encode_record(MEMPOOL_HEIGHT, 0, 546, &stale_script)).unwrap();
        store.zadd(&Family::SellByToken.key(&scope, Role::Confirmed).unwrap(), &ready, 10).unwrap();
        store.zadd(&Family::SellByToken.key(&scope, Role::PendingAdd).unwrap(), &stale, 1).unwrap();
        // only the first contract holds its NFT
        store.zadd(
            &Family::NftHolders.key(&scope, Role::Balance).unwrap(),
            &Hash160::digest(&ready_script).0,
            1,
        ).unwrap();

        let listing = assembler(store, 109).sell_utxos(nft_code, genesis, 0, 10).await.unwrap();
        assert_eq!(listing.utxo.len(), 2);
        assert_eq!(listing.utxo[0].price, 2000);
        assert!(!listing.utxo[0].is_ready);
        assert_eq!(listing.utxo[0].confirmations, 0);
        assert_eq!(listing.utxo[1].price, 1000);
        assert!(listing.utxo[1].is_ready);
        assert_eq!(listing.utxo[1].confirmations, 10);
        assert_eq!(listing.counts.total, 2);
    }

    #[tokio::test]
    async fn test_enrichment_failure_does_not_fail_page() {
        let store = Arc::new(MemoryStore::new());
        let genesis = Hash160([4; 20]);
        let seller = Hash160([5; 20]);
        let scope = Scope::Address(seller);
        let member = Outpoint::new([1; 32], 0).to_member();
        store.put_record(&member, &encode_record(100, 0, 546, &sell_script(seller, 10, genesis, 1))).unwrap();
        store.zadd(&Family::SellByAddress.key(&scope, Role::Confirmed).unwrap(), &member, 1).unwrap();
        store.fail_keys_with_prefix(&[Family::NftHolders.tag()]);

        let listing = assembler(store, 100).sell_utxos_by_address(seller, 0, 10).await.unwrap();
        assert_eq!(listing.utxo.len(), 1);
        assert!(!listing.utxo[0].is_ready);
    }

    #[tokio::test]
    async fn test_nft_detail_exact_match() {
        let store = Arc::new(MemoryStore::new());
        let code = Hash160::digest(&[0x51, 0x52, 0x53, 0x75]);
        let genesis = Hash160([4; 20]);
        let owner = Hash160([6; 20]);
        let scope = Scope::Token { code_hash: code, genesis };
        let member = Outpoint::new([3; 32], 1).to_member();
        store.put_record(&member, &encode_record(50, 2, 546, &nft_script(owner, 12, genesis))).unwrap();
        store.zadd(&Family::NftToken.key(&scope, Role::Indexed).unwrap(), &member, 12).unwrap();

        let assembler = assembler(store, 60);
        let items = assembler.nft_utxo_detail(code, genesis, 12).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].token_index, 12);
        assert_eq!(items[0].confirmations, 11);
        assert_eq!(items[0].vout, 1);

        let err = assembler.nft_utxo_detail(code, genesis, 13).await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ft_summary_joins_token_info() {
        let store = Arc::new(MemoryStore::new());
        let address = Hash160([7; 20]);
        let known = (Hash160([1; 20]), Hash160([2; 20]));
        let unknown = (Hash160([3; 20]), Hash160([4; 20]));
        let scope = Scope::Address(address);
        let balance = Family::FtSummary.key(&scope, Role::Balance).unwrap();
        let delta = Family::FtSummary.key(&scope, Role::BalanceDelta).unwrap();
        store.zadd(&balance, &token_member(&known.0, &known.1), 900).unwrap();
        store.zadd(&delta, &token_member(&known.0, &known.1), 100).unwrap();
        store.zadd(&balance, &token_member(&unknown.0, &unknown.1), 5).unwrap();
        let info = TokenInfo { decimals: 2, name: "Known".to_string(), symbol: "KN".to_string() };
        store.put_record(&token_info_key(&known.0, &known.1), &info.encode()).unwrap();

        let summary = assembler(store, 1).ft_summary(address, 0, 10).await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.list[0].name, "Known");
        assert_eq!(summary.list[0].balance, 800);
        assert_eq!(summary.list[0].pending_balance, 100);
        assert_eq!(summary.list[1].name, "");
        assert_eq!(summary.list[1].decimal, 0);
    }

    #[tokio::test]
    async fn test_address_balance_reports_settled() {
        let store = Arc::new(MemoryStore::new());
        let x = Hash160([9; 20]);
        store.zadd(&Family::PlainBalance.key(&Scope::All, Role::Balance).unwrap(), &x.0, 1000).unwrap();
        store.zadd(&Family::PlainBalance.key(&Scope::All, Role::BalanceDelta).unwrap(), &x.0, 150).unwrap();
        let balance = assembler(store, 1).address_balance(x).await.unwrap();
        assert_eq!(balance.balance, 850);
        assert_eq!(balance.pending_balance, 150);
    }
}
