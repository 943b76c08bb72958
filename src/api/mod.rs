// API Module
//
// Each domain (addresses, fungible tokens, NFTs, marketplace) is in its own
// submodule. Handlers share one `Assembler` through an `Extension` layer.

pub mod types;
pub mod helpers;
pub mod addresses;
pub mod ft;
pub mod nft;
pub mod market;

use std::sync::Arc;

use axum::{http::header, response::IntoResponse, routing::get, Extension, Router};
use tower_http::cors::CorsLayer;

use crate::assemble::Assembler;
use crate::metrics::gather_metrics;

pub use helpers::*;
pub use types::*;

pub fn router(assembler: Arc<Assembler>) -> Router {
    Router::new()
        .route("/height", get(addresses::height))
        .route("/address/{address}/balance", get(addresses::address_balance))
        .route("/address/{address}/utxo", get(addresses::address_utxo))
        .route("/address/{address}/utxo-data", get(addresses::address_utxo_data))
        .route("/balance/rich", get(addresses::rich_list))
        .route("/ft/utxo/{codehash}/{genesis}/{address}", get(ft::ft_utxo))
        .route("/ft/utxo-data/{codehash}/{genesis}/{address}", get(ft::ft_utxo_data))
        .route("/ft/balance/{codehash}/{genesis}/{address}", get(ft::ft_balance))
        .route("/ft/owners/{codehash}/{genesis}", get(ft::ft_owners))
        .route("/ft/summary/{address}", get(ft::ft_summary))
        .route("/nft/utxo/{codehash}/{genesis}/{address}", get(nft::nft_utxo))
        .route("/nft/utxo-data/{codehash}/{genesis}/{address}", get(nft::nft_utxo_data))
        .route("/nft/utxo-by-id/{codehash}/{nftid}", get(nft::nft_utxo_by_id))
        .route("/nft/utxo-detail/{codehash}/{genesis}/{token_index}", get(nft::nft_utxo_detail))
        .route("/nft/owners/{codehash}/{genesis}", get(nft::nft_owners))
        .route("/nft/summary/{address}", get(nft::nft_summary))
        .route("/nft/sell/utxo/{codehash}/{genesis}", get(market::sell_utxo))
        .route("/nft/sell/utxo-by-address/{address}", get(market::sell_utxo_by_address))
        .route(
            "/nft/sell/utxo-detail/{codehash}/{genesis}/{token_index}",
            get(market::sell_utxo_detail),
        )
        .route("/metrics", get(metrics_handler))
        .layer(Extension(assembler))
        .layer(CorsLayer::permissive())
}

/// GET /metrics
/// Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
