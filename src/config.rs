pub use config::{Config, Environment, File as ConfigFile};
pub use once_cell::sync::OnceCell;
use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

use bitcoin::network::constants::Network;

static GLOBAL_CONFIG: OnceCell<Config> = OnceCell::new();

/// Loads `path` (extension optional) plus `TOKENBLOX_*` overrides, e.g.
/// `TOKENBLOX_STORE__DB_PATH`.
pub fn init_global_config(path: &str) -> Result<(), Box<dyn Error>> {
    let config = Config::builder()
        .add_source(ConfigFile::with_name(path).required(false))
        .add_source(Environment::with_prefix("TOKENBLOX").separator("__"))
        .build()?;
    GLOBAL_CONFIG
        .set(config)
        .map_err(|_| "Config already set")?;
    Ok(())
}

pub fn get_global_config() -> Option<&'static Config> {
    GLOBAL_CONFIG.get()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    RocksDb,
    Memory,
}

/// Typed view over the loaded configuration. Every key has a default so an
/// empty config file still yields a usable service.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: String,
    pub backend: StoreBackend,
    pub db_path: String,
    pub store_timeout: Duration,
    pub max_page_size: u64,
    pub default_page_size: u64,
    pub network: Network,
    pub log_level: String,
    pub log_format: String,
    pub log_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            backend: StoreBackend::RocksDb,
            db_path: "./data/tokenblox".to_string(),
            store_timeout: Duration::from_millis(3000),
            max_page_size: 1000,
            default_page_size: 16,
            network: Network::Bitcoin,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            log_file: None,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Result<Self, Box<dyn Error>> {
        let defaults = Settings::default();

        let backend = match config
            .get_string("store.backend")
            .unwrap_or_else(|_| "rocksdb".to_string())
            .as_str()
        {
            "rocksdb" => StoreBackend::RocksDb,
            "memory" => StoreBackend::Memory,
            other => return Err(format!("unknown store.backend: {}", other).into()),
        };

        let db_path = config
            .get_string("store.db_path")
            .unwrap_or(defaults.db_path);
        let db_path = shellexpand::full(&db_path)?.into_owned();

        let timeout_ms = config
            .get_int("store.timeout_ms")
            .unwrap_or(defaults.store_timeout.as_millis() as i64);
        if timeout_ms <= 0 {
            return Err("store.timeout_ms must be positive".into());
        }

        let max_page_size = config
            .get_int("query.max_page_size")
            .unwrap_or(defaults.max_page_size as i64);
        let default_page_size = config
            .get_int("query.default_page_size")
            .unwrap_or(defaults.default_page_size as i64);
        if max_page_size <= 0 || default_page_size <= 0 || default_page_size > max_page_size {
            return Err("query page sizes must satisfy 0 < default_page_size <= max_page_size".into());
        }

        let network = match config.get_string("query.network") {
            Ok(name) => Network::from_str(&name).map_err(|e| format!("query.network: {}", e))?,
            Err(_) => defaults.network,
        };

        Ok(Self {
            listen: config.get_string("server.listen").unwrap_or(defaults.listen),
            backend,
            db_path,
            store_timeout: Duration::from_millis(timeout_ms as u64),
            max_page_size: max_page_size as u64,
            default_page_size: default_page_size as u64,
            network,
            log_level: config.get_string("log.level").unwrap_or(defaults.log_level),
            log_format: config.get_string("log.format").unwrap_or(defaults.log_format),
            log_file: config.get_string("log.file").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_empty_config() {
        let config = Config::builder().build().unwrap();
        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings.backend, StoreBackend::RocksDb);
        assert_eq!(settings.max_page_size, 1000);
        assert_eq!(settings.store_timeout, Duration::from_millis(3000));
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn test_settings_overrides() {
        let config = Config::builder()
            .set_override("store.backend", "memory")
            .unwrap()
            .set_override("query.max_page_size", 50)
            .unwrap()
            .set_override("query.default_page_size", 10)
            .unwrap()
            .set_override("query.network", "testnet")
            .unwrap()
            .build()
            .unwrap();
        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings.backend, StoreBackend::Memory);
        assert_eq!(settings.max_page_size, 50);
        assert_eq!(settings.network, Network::Testnet);
    }

    #[test]
    fn test_settings_rejects_bad_page_sizes() {
        let config = Config::builder()
            .set_override("query.max_page_size", 5)
            .unwrap()
            .set_override("query.default_page_size", 10)
            .unwrap()
            .build()
            .unwrap();
        assert!(Settings::from_config(&config).is_err());
    }
}
