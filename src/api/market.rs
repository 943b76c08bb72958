// NFT Marketplace API Endpoints
//
// Listings carry `isReady`, which is best effort: a failed lookup reports
// false instead of failing the page.

use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, Query},
    Extension, Json,
};

use super::helpers::{page_params, parse_address, parse_hash, parse_token_index, query_error, ApiResult};
use super::types::{NftSellItem, PageQuery};
use crate::assemble::Assembler;

/// GET /nft/sell/utxo/{codehash}/{genesis}
pub async fn sell_utxo(
    AxumPath((code_hash, genesis)): AxumPath<(String, String)>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Vec<NftSellItem>> {
    let code_hash = parse_hash(&code_hash)?;
    let genesis = parse_hash(&genesis)?;
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let listing = assembler
        .sell_utxos(code_hash, genesis, cursor, size)
        .await
        .map_err(query_error)?;
    Ok(Json(listing.utxo))
}

/// GET /nft/sell/utxo-by-address/{address}
pub async fn sell_utxo_by_address(
    AxumPath(address): AxumPath<String>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Vec<NftSellItem>> {
    let address = parse_address(&address)?;
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let listing = assembler
        .sell_utxos_by_address(address, cursor, size)
        .await
        .map_err(query_error)?;
    Ok(Json(listing.utxo))
}

/// GET /nft/sell/utxo-detail/{codehash}/{genesis}/{token_index}
pub async fn sell_utxo_detail(
    AxumPath((code_hash, genesis, token_index)): AxumPath<(String, String, String)>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Vec<NftSellItem>> {
    let code_hash = parse_hash(&code_hash)?;
    let genesis = parse_hash(&genesis)?;
    let token_index = parse_token_index(&token_index)?;
    let items = assembler
        .sell_utxo_detail(code_hash, genesis, token_index)
        .await
        .map_err(query_error)?;
    Ok(Json(items))
}
