use std::{env, fmt, fs, io, ops::Deref, str::FromStr, sync::Arc, time::Duration};

use tracing::Level;

use crate::{
    decoder::TransactionDecoder,
    dispatcher::Dispatcher,
    error::Error,
    provider::{ChainClient, ChainQuery},
    range::RangeFetcher,
    router::{DecodeStats, Router},
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

pub struct State {
    pub config: Config,
    pub client: Arc<dyn ChainQuery>,
    pub stats: Arc<DecodeStats>,
    pub dispatcher: Dispatcher,
}

impl State {
    pub async fn new(config: Config) -> Result<State, Error> {
        let client: Arc<dyn ChainQuery> =
            Arc::new(ChainClient::new(&config).await?);
        Ok(Self::with_client(config, client))
    }

    /// Wires the decoding pipeline on top of an existing chain client.
    pub fn with_client(config: Config, client: Arc<dyn ChainQuery>) -> State {
        let stats = Arc::new(DecodeStats::default());
        let router = Router::new(&config.unbonded_pool_address, stats.clone());
        let fetcher = RangeFetcher::new(
            client.clone(),
            TransactionDecoder::new(router),
            config.workers,
        );
        let dispatcher = Dispatcher::new(
            client.clone(),
            fetcher,
            config.maximum_heights_to_get,
            Duration::from_secs(config.task_timeout),
        );

        State {
            config,
            client,
            stats,
            dispatcher,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Environment {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            _ => Err(io::Error::other(format!(
                "Unknown environment {}",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: Environment,
    pub server_host: String,
    pub port: u16,
    pub grpc_host: String,
    pub lcd_host: String,
    pub datahub_key: String,
    pub chain_id: String,
    pub maximum_heights_to_get: u64,
    pub requests_per_second: u32,
    pub workers: usize,
    pub timeout_block_call: u64,
    pub timeout_search_tx_call: u64,
    pub task_timeout: u64,
    pub block_cache_capacity: usize,
    pub unbonded_pool_address: String,
    pub log_level: Level,
}

#[cfg(feature = "testnet")]
const DEFAULT_CHAIN_ID: &str = "theta-testnet-001";

#[cfg(not(feature = "testnet"))]
const DEFAULT_CHAIN_ID: &str = "cosmoshub-4";

const DEFAULT_UNBONDED_POOL: &str =
    "cosmos1tygms3xhhs3yv487phx3dw4a95jn7t7lpm470r";

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn required(key: &str) -> Result<String, Error> {
    env::var(key).map_err(|_| {
        Error::ConfigurationError(format!("{} is not set", key))
    })
}

pub fn get_configuration() -> Result<Config, Error> {
    let app_env = var_or("APP_ENV", "development").parse()?;
    let server_host = var_or("ADDRESS", "0.0.0.0");
    let port: u16 = var_or("HTTP_PORT", "8087").parse()?;
    let grpc_host = required("COSMOS_GRPC_ADDR")?;
    let lcd_host = required("COSMOS_LCD_ADDR")?;
    let datahub_key = var_or("DATAHUB_KEY", "");
    let chain_id = var_or("CHAIN_ID", DEFAULT_CHAIN_ID);
    let maximum_heights_to_get =
        var_or("MAXIMUM_HEIGHTS_TO_GET", "10000").parse()?;
    let requests_per_second = var_or("REQUESTS_PER_SECOND", "33").parse()?;
    let workers = var_or("WORKERS", "10").parse()?;
    let timeout_block_call = var_or("TIMEOUT_BLOCK_CALL", "30").parse()?;
    let timeout_search_tx_call =
        var_or("TIMEOUT_SEARCH_TX_CALL", "10").parse()?;
    let task_timeout = var_or("TASK_TIMEOUT", "600").parse()?;
    let block_cache_capacity =
        var_or("BLOCK_CACHE_CAPACITY", "400").parse()?;
    let unbonded_pool_address =
        var_or("UNBONDED_POOL_ADDRESS", DEFAULT_UNBONDED_POOL);
    let log_level = Level::from_str(&var_or("LOG_LEVEL", "info"))
        .map_err(|err| Error::ConfigurationError(err.to_string()))?;

    let config = Config {
        app_env,
        server_host,
        port,
        grpc_host,
        lcd_host,
        datahub_key,
        chain_id,
        maximum_heights_to_get,
        requests_per_second,
        workers,
        timeout_block_call,
        timeout_search_tx_call,
        task_timeout,
        block_cache_capacity,
        unbonded_pool_address,
        log_level,
    };

    Ok(config)
}

/// Loads `.env` from the working directory into the process environment.
/// Variables already set take precedence; a missing file is not an error.
pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";

    let config_string = match fs::read_to_string(config_file) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    for (key, value) in parse_config_string(&config_string) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }

    Ok(())
}

fn parse_config_string(config: &str) -> Vec<(&str, &str)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_file() {
        let parsed = parse_config_string(
            "# node\nCOSMOS_GRPC_ADDR=https://grpc.example:443\n\nWORKERS = 12\nDATAHUB_KEY=\"abc=def\"\nbroken line\n",
        );

        assert_eq!(
            parsed,
            [
                ("COSMOS_GRPC_ADDR", "https://grpc.example:443"),
                ("WORKERS", "12"),
                ("DATAHUB_KEY", "abc=def"),
            ]
        );
    }

    #[test]
    fn environment_names() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(Environment::Development.to_string(), "development");
        assert!("staging".parse::<Environment>().is_err());
    }
}
