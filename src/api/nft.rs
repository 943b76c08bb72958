// Non-Fungible Token API Endpoints

use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, Query},
    Extension, Json,
};

use super::helpers::{page_params, parse_address, parse_hash, parse_token_index, query_error, ApiResult};
use super::types::{Listing, NftOwnerEntry, NftSummaryEntry, NftUtxoItem, PageQuery, Ranked};
use crate::assemble::Assembler;

/// GET /nft/utxo/{codehash}/{genesis}/{address}
pub async fn nft_utxo(
    AxumPath(ids): AxumPath<(String, String, String)>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Vec<NftUtxoItem>> {
    let Json(listing) = nft_utxo_data(AxumPath(ids), Query(query), Extension(assembler)).await?;
    Ok(Json(listing.utxo))
}

/// GET /nft/utxo-data/{codehash}/{genesis}/{address}
pub async fn nft_utxo_data(
    AxumPath((code_hash, genesis, address)): AxumPath<(String, String, String)>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Listing<NftUtxoItem>> {
    let code_hash = parse_hash(&code_hash)?;
    let genesis = parse_hash(&genesis)?;
    let address = parse_address(&address)?;
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let listing = assembler
        .nft_utxos(code_hash, genesis, address, cursor, size)
        .await
        .map_err(query_error)?;
    Ok(Json(listing))
}

/// GET /nft/utxo-by-id/{codehash}/{nftid}
pub async fn nft_utxo_by_id(
    AxumPath((code_hash, nft_id)): AxumPath<(String, String)>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<NftUtxoItem> {
    let code_hash = parse_hash(&code_hash)?;
    let nft_id = parse_hash(&nft_id)?;
    let item = assembler.nft_utxo_by_id(code_hash, nft_id).await.map_err(query_error)?;
    Ok(Json(item))
}

/// GET /nft/utxo-detail/{codehash}/{genesis}/{token_index}
/// Exact match on token index; 404 when nothing matches.
pub async fn nft_utxo_detail(
    AxumPath((code_hash, genesis, token_index)): AxumPath<(String, String, String)>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Vec<NftUtxoItem>> {
    let code_hash = parse_hash(&code_hash)?;
    let genesis = parse_hash(&genesis)?;
    let token_index = parse_token_index(&token_index)?;
    let items = assembler
        .nft_utxo_detail(code_hash, genesis, token_index)
        .await
        .map_err(query_error)?;
    Ok(Json(items))
}

/// GET /nft/owners/{codehash}/{genesis}
pub async fn nft_owners(
    AxumPath((code_hash, genesis)): AxumPath<(String, String)>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Ranked<NftOwnerEntry>> {
    let code_hash = parse_hash(&code_hash)?;
    let genesis = parse_hash(&genesis)?;
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let ranked = assembler
        .nft_owners(code_hash, genesis, cursor, size)
        .await
        .map_err(query_error)?;
    Ok(Json(ranked))
}

/// GET /nft/summary/{address}
pub async fn nft_summary(
    AxumPath(address): AxumPath<String>,
    Query(query): Query<PageQuery>,
    Extension(assembler): Extension<Arc<Assembler>>,
) -> ApiResult<Ranked<NftSummaryEntry>> {
    let address = parse_address(&address)?;
    let (cursor, size) = page_params(&query, assembler.default_page_size());
    let ranked = assembler.nft_summary(address, cursor, size).await.map_err(query_error)?;
    Ok(Json(ranked))
}
