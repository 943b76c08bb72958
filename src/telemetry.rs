/// Telemetry - structured logging with tracing
///
/// - RUST_LOG takes precedence over the configured level
/// - "json" or "pretty" output
/// - optional file output with rotation

use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "trace", "debug", "info", "warn", "error"
    pub log_level: String,
    /// "json" or "pretty"
    pub log_format: String,
    /// None = console only
    pub log_file: Option<String>,
    /// "daily", "hourly", "never"
    pub rotation: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: std::env::var("TOKENBLOX_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            log_file: std::env::var("TOKENBLOX_LOG_FILE").ok(),
            rotation: "daily".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Settings fill whatever the environment left unset.
    pub fn from_settings(settings: &Settings) -> Self {
        let env = Self::default();
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_level.clone()),
            log_format: std::env::var("TOKENBLOX_LOG_FORMAT")
                .unwrap_or_else(|_| settings.log_format.clone()),
            log_file: env.log_file.or_else(|| settings.log_file.clone()),
            rotation: env.rotation,
        }
    }
}

pub fn init_tracing(config: TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let json = config.log_format == "json";

    if let Some(log_file_path) = config.log_file {
        let path = std::path::Path::new(&log_file_path);
        let directory = path
            .parent()
            .ok_or("Invalid log file path: no parent directory")?;
        let filename_prefix = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or("Invalid log file path: no filename")?;

        let file_appender = match config.rotation.as_str() {
            "hourly" => rolling::hourly(directory, filename_prefix),
            "never" => rolling::never(directory, filename_prefix),
            _ => rolling::daily(directory, filename_prefix),
        };
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_current_span(true).with_writer(non_blocking))
                .try_init()?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_file(true)
                        .with_line_number(true)
                        .with_writer(non_blocking),
                )
                .try_init()?;
        }

        // Dropping the guard stops the background writer.
        std::mem::forget(guard);
    } else if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_file(true).with_line_number(true))
            .try_init()?;
    }

    Ok(())
}

/// Shortens hex identifiers in log fields.
///
/// "0a1b2c3d4e5f67890a1b2c3d4e5f6789" with len 16 → "0a1b2c3d4e5f6789..."
pub fn truncate_hex(hex: &str, len: usize) -> String {
    if hex.len() <= len {
        hex.to_string()
    } else {
        format!("{}...", &hex[..len])
    }
}

/// Hex-encodes a member or key for logging, truncated to 16 chars.
pub fn short_hex(bytes: &[u8]) -> String {
    truncate_hex(&hex::encode(bytes), 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_hex() {
        assert_eq!(truncate_hex("abcd", 16), "abcd");
        assert_eq!(truncate_hex("0123456789abcdef0123456789abcdef", 16), "0123456789abcdef...");
        assert_eq!(truncate_hex("", 16), "");
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(short_hex(&[0xde, 0xad]), "dead");
        assert_eq!(short_hex(&[0u8; 32]), format!("{}...", "0".repeat(16)));
    }

    #[test]
    fn test_settings_fill_unset_env() {
        let mut settings = Settings::default();
        settings.log_file = Some("/tmp/tokenblox/query.log".to_string());
        let config = TelemetryConfig::from_settings(&settings);
        if std::env::var("TOKENBLOX_LOG_FILE").is_err() {
            assert_eq!(config.log_file.as_deref(), Some("/tmp/tokenblox/query.log"));
        }
    }
}
