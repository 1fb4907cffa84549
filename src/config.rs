use crate::domain::ChainId;
use crate::engine::ProjectionSettings;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub streams: Vec<StreamConfig>,
    pub nft_expiration_window_secs: i64,
    pub nft_correlation_window_secs: u64,
    pub nft_home_chain_id: Option<ChainId>,
    pub poll_interval_ms: u64,
    pub batch_size: usize,
    /// Retry budget for one chain read before its value is treated as absent.
    pub rpc_max_elapsed_ms: u64,
}

/// One indexed chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConfig {
    pub chain_id: ChainId,
    /// Cross-chain protocol selector for this chain.
    pub chain_selector: u64,
    pub rpc_url: String,
    /// Newline-delimited JSON event file.
    pub events_path: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl StreamConfig {
    /// `{chainId}` or `{chainId}-{label}`.
    pub fn stream_id(&self) -> String {
        match &self.label {
            Some(label) => format!("{}-{}", self.chain_id, label),
            None => self.chain_id.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or_default::<u16>(&env_map, "PORT", "8080", "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let streams = parse_streams_from_map(&env_map)?;

        let nft_expiration_window_secs = parse_or_default::<i64>(
            &env_map,
            "NFT_EXPIRATION_WINDOW_SECS",
            "86400",
            "must be a valid i64",
        )?;
        if nft_expiration_window_secs < 0 {
            return Err(ConfigError::InvalidValue(
                "NFT_EXPIRATION_WINDOW_SECS".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let nft_correlation_window_secs = parse_or_default::<u64>(
            &env_map,
            "NFT_CORRELATION_WINDOW_SECS",
            "3600",
            "must be a valid u64",
        )?;

        let nft_home_chain_id = match env_map.get("NFT_HOME_CHAIN_ID") {
            Some(raw) if !raw.trim().is_empty() => Some(ChainId(raw.trim().parse::<u64>().map_err(
                |_| {
                    ConfigError::InvalidValue(
                        "NFT_HOME_CHAIN_ID".to_string(),
                        "must be a valid u64".to_string(),
                    )
                },
            )?)),
            _ => None,
        };

        let poll_interval_ms =
            parse_or_default::<u64>(&env_map, "POLL_INTERVAL_MS", "2000", "must be a valid u64")?;

        let batch_size =
            parse_or_default::<usize>(&env_map, "BATCH_SIZE", "500", "must be a valid usize")?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "BATCH_SIZE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let rpc_max_elapsed_ms = parse_or_default::<u64>(
            &env_map,
            "RPC_MAX_ELAPSED_MS",
            "30000",
            "must be a valid u64",
        )?;

        Ok(Config {
            port,
            database_path,
            streams,
            nft_expiration_window_secs,
            nft_correlation_window_secs,
            nft_home_chain_id,
            poll_interval_ms,
            batch_size,
            rpc_max_elapsed_ms,
        })
    }

    /// Projection parameters for one stream.
    pub fn projection_settings(&self, stream: &StreamConfig) -> ProjectionSettings {
        ProjectionSettings {
            chain_selector: stream.chain_selector,
            nft_home_chain: self.nft_home_chain_id,
            nft_expiration_window_secs: self.nft_expiration_window_secs,
            nft_correlation_window_secs: self.nft_correlation_window_secs,
        }
    }
}

fn parse_or_default<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    expectation: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), expectation.to_string()))
}

/// Streams come from inline `STREAMS` JSON or from the file named by `STREAMS_FILE`.
fn parse_streams_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Vec<StreamConfig>, ConfigError> {
    let (key, json) = if let Some(inline) = env_map.get("STREAMS") {
        ("STREAMS", inline.clone())
    } else if let Some(file_path) = env_map.get("STREAMS_FILE") {
        let content = std::fs::read_to_string(file_path).map_err(|_| {
            ConfigError::InvalidValue(
                "STREAMS_FILE".to_string(),
                "file not found or unreadable".to_string(),
            )
        })?;
        ("STREAMS_FILE", content)
    } else {
        return Err(ConfigError::MissingEnv("STREAMS_FILE".to_string()));
    };

    let streams: Vec<StreamConfig> = serde_json::from_str(&json)
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("invalid JSON: {}", e)))?;

    if streams.is_empty() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must define at least one stream".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for stream in &streams {
        if !seen.insert(stream.stream_id()) {
            return Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("duplicate stream {}", stream.stream_id()),
            ));
        }
    }

    Ok(streams)
}
