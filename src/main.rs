//! tokenblox server
//!
//! ```bash
//! cargo run --release -- --config config.toml
//! TOKENBLOX_STORE__BACKEND=memory cargo run -- --listen 127.0.0.1:3000
//! ```

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use tokenblox::api;
use tokenblox::assemble::Assembler;
use tokenblox::chain_state::{ChainTip, FixedTip, RocksChainTip};
use tokenblox::classifier::SensibleClassifier;
use tokenblox::config::{get_global_config, init_global_config, Settings, StoreBackend};
use tokenblox::metrics::init_metrics;
use tokenblox::store::{MemoryStore, OrderedSetStore, RocksStore};
use tokenblox::telemetry::{init_tracing, TelemetryConfig};

#[derive(Parser, Debug)]
#[clap(name = "tokenblox")]
#[clap(about = "Mempool-aware UTXO, token and marketplace query service", long_about = None)]
struct Args {
    /// Config file, extension optional
    #[clap(long, default_value = "config.toml")]
    config: String,

    /// Overrides server.listen
    #[clap(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    init_global_config(&args.config)?;
    let config = get_global_config().ok_or("Config not initialized")?;
    let mut settings = Settings::from_config(config)?;
    if let Some(listen) = args.listen {
        settings.listen = listen;
    }

    init_tracing(TelemetryConfig::from_settings(&settings))?;
    init_metrics();

    let (store, tip): (Arc<dyn OrderedSetStore>, Arc<dyn ChainTip>) = match settings.backend {
        StoreBackend::RocksDb => {
            let rocks = RocksStore::open(&settings.db_path)?;
            let tip = Arc::new(RocksChainTip::new(rocks.db()));
            info!(path = %settings.db_path, "opened rocksdb store");
            (Arc::new(rocks), tip)
        }
        StoreBackend::Memory => {
            warn!("memory backend selected, all collections start empty");
            (Arc::new(MemoryStore::new()), Arc::new(FixedTip::default()))
        }
    };

    let classifier = Arc::new(SensibleClassifier::new(settings.network));
    let assembler = Arc::new(Assembler::new(store, classifier, tip, &settings));
    let app = api::router(assembler);

    let listener = TcpListener::bind(&settings.listen).await?;
    info!(
        listen = %settings.listen,
        backend = ?settings.backend,
        timeout_ms = settings.store_timeout.as_millis() as u64,
        max_page_size = settings.max_page_size,
        "tokenblox listening"
    );
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
