// Address, Balance and Chain API Endpoints

use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, Query},
    Extension, Json,
};

use super::helpers::{page_params, parse_address, query_error, ApiResult};
use super::types::{BalanceInfo, HeightInfo, Listing, PageQuery, Ranked, UtxoItem};
use crate::assemble::Assembler;

/// GET /height
pub async fn height(Extension(assembler): Extension<Arc<Assembler>>) -> ApiResult<HeightInfo> {
    let height = assembler.best_height().await.map_err(query_error)?;
    Ok(Json(HeightInfo { height }))
}

/// GET /address/{address}/balance
/// Settled balance plus the pending (mempool) part.
pub async fn address_balance(
    AxumPath(address): AxumPath<String>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<BalanceInfo> {
    let address = parse_address(&address)?;
    let balance = assembler.address_balance(address).await.map_err(query_error)?;
    Ok(Json(balance))
}

/// GET /address/{address}/utxo
pub async fn address_utxo(
    AxumPath(address): AxumPath<String>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Vec<UtxoItem>> {
    let Json(listing) = address_utxo_data(AxumPath(address), Query(query), Extension(assembler)).await?;
    Ok(Json(listing.utxo))
}

/// GET /address/{address}/utxo-data
pub async fn address_utxo_data(
    AxumPath(address): AxumPath<String>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Listing<UtxoItem>> {
    let address = parse_address(&address)?;
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let listing = assembler
        .address_utxos(address, cursor, size)
        .await
        .map_err(query_error)?;
    Ok(Json(listing))
}

/// GET /balance/rich
/// Chain-wide balance leaderboard.
pub async fn rich_list(
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Ranked<BalanceInfo>> {
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let ranked = assembler.rich_list(cursor, size).await.map_err(query_error)?;
    Ok(Json(ranked))
}
