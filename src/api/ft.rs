// Fungible Token API Endpoints

use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, Query},
    Extension, Json,
};

use super::helpers::{page_params, parse_address, parse_hash, query_error, ApiResult};
use super::types::{BalanceInfo, FtBalanceInfo, FtSummaryEntry, FtUtxoItem, Listing, PageQuery, Ranked};
use crate::assemble::Assembler;

/// GET /ft/utxo/{codehash}/{genesis}/{address}
pub async fn ft_utxo(
    AxumPath(ids): AxumPath<(String, String, String)>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Vec<FtUtxoItem>> {
    let Json(listing) = ft_utxo_data(AxumPath(ids), Query(query), Extension(assembler)).await?;
    Ok(Json(listing.utxo))
}

/// GET /ft/utxo-data/{codehash}/{genesis}/{address}
pub async fn ft_utxo_data(
    AxumPath((code_hash, genesis, address)): AxumPath<(String, String, String)>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Listing<FtUtxoItem>> {
    let code_hash = parse_hash(&code_hash)?;
    let genesis = parse_hash(&genesis)?;
    let address = parse_address(&address)?;
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let listing = assembler
        .ft_utxos(code_hash, genesis, address, cursor, size)
        .await
        .map_err(query_error)?;
    Ok(Json(listing))
}

/// GET /ft/balance/{codehash}/{genesis}/{address}
pub async fn ft_balance(
    AxumPath((code_hash, genesis, address)): AxumPath<(String, String, String)>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<FtBalanceInfo> {
    let code_hash = parse_hash(&code_hash)?;
    let genesis = parse_hash(&genesis)?;
    let address = parse_address(&address)?;
    let balance = assembler
        .ft_balance(code_hash, genesis, address)
        .await
        .map_err(query_error)?;
    Ok(Json(balance))
}

/// GET /ft/owners/{codehash}/{genesis}
/// Holders ranked by balance, pending transfers included.
pub async fn ft_owners(
    AxumPath((code_hash, genesis)): AxumPath<(String, String)>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Ranked<BalanceInfo>> {
    let code_hash = parse_hash(&code_hash)?;
    let genesis = parse_hash(&genesis)?;
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let ranked = assembler
        .ft_owners(code_hash, genesis, cursor, size)
        .await
        .map_err(query_error)?;
    Ok(Json(ranked))
}

/// GET /ft/summary/{address}
pub async fn ft_summary(
    AxumPath(address): AxumPath<String>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Ranked<FtSummaryEntry>> {
    let address = parse_address(&address)?;
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let ranked = assembler.ft_summary(address, cursor, size).await.map_err(query_error)?;
    Ok(Json(ranked))
}
