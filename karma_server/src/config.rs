//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use karma_core::db::DatabaseConfig;
use karma_core::valuation::{
    DemandSignal, FixedDemand, MAX_DEMAND_ADJUSTMENT, MarketDemand, RandomDemand,
};
use karma_core::wallet::{AccountId, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, TradingMode};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Which store backend to run against
    pub store: StoreBackend,
    /// Karma economy settings
    pub karma: KarmaConfig,
    /// Prometheus scrape address, exporter disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Non-persistent, for local runs and demos
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Where the valuation demand adjustment comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandMode {
    /// Constant adjustment
    Fixed(i64),
    /// Uniform random in the allowed range, seeded when a seed is given
    Random(Option<u64>),
    /// Derived from listings and open requests in the category
    Market,
}

/// Karma economy configuration
#[derive(Debug, Clone)]
pub struct KarmaConfig {
    /// Storefront trading mode reported to clients
    pub trading_mode: TradingMode,
    /// Demand signal used when pricing listings
    pub demand: DemandMode,
    /// Default wallet history page size
    pub history_page: i64,
    /// Accounts allowed to resolve disputes
    pub operators: Vec<AccountId>,
}

impl Default for KarmaConfig {
    fn default() -> Self {
        Self {
            trading_mode: TradingMode::Karma,
            demand: DemandMode::Fixed(0),
            history_page: DEFAULT_HISTORY_LIMIT,
            operators: Vec::new(),
        }
    }
}

impl KarmaConfig {
    /// Build the configured demand signal
    pub fn demand_signal(&self) -> Arc<dyn DemandSignal> {
        match self.demand {
            DemandMode::Fixed(adjustment) => Arc::new(FixedDemand(adjustment)),
            DemandMode::Random(Some(seed)) => Arc::new(RandomDemand::seeded(seed)),
            DemandMode::Random(None) => Arc::new(RandomDemand::from_entropy()),
            DemandMode::Market => Arc::new(MarketDemand),
        }
    }

    pub fn is_operator(&self, account_id: AccountId) -> bool {
        self.operators.contains(&account_id)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `store_override` - Optional store backend override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to a value that cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        store_override: Option<StoreBackend>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_required_format("SERVER_BIND")?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 6969))),
        };

        let database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| DatabaseConfig::development().database_url);

        let database = DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5),
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 5),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800),
        };

        let store = match store_override {
            Some(store) => store,
            None => parse_env_required_format("KARMA_STORE")?.unwrap_or(StoreBackend::Postgres),
        };

        let trading_mode =
            parse_env_required_format("KARMA_TRADING_MODE")?.unwrap_or(TradingMode::Karma);

        let demand = match std::env::var("KARMA_DEMAND")
            .unwrap_or_else(|_| "fixed".to_string())
            .to_lowercase()
            .as_str()
        {
            "fixed" => DemandMode::Fixed(
                parse_env_required_format("KARMA_DEMAND_ADJUSTMENT")?.unwrap_or(0),
            ),
            "random" => DemandMode::Random(parse_env_required_format("KARMA_DEMAND_SEED")?),
            "market" => DemandMode::Market,
            other => {
                return Err(ConfigError::Invalid {
                    var: "KARMA_DEMAND".to_string(),
                    reason: format!("'{other}' is not one of fixed, random, market"),
                });
            }
        };

        let operators = match std::env::var("KARMA_OPERATOR_ACCOUNTS") {
            Ok(raw) => parse_operators(&raw)?,
            Err(_) => Vec::new(),
        };

        let karma = KarmaConfig {
            trading_mode,
            demand,
            history_page: parse_env_or("KARMA_HISTORY_PAGE", DEFAULT_HISTORY_LIMIT),
            operators,
        };

        let metrics_bind = parse_env_required_format("METRICS_BIND")?;

        Ok(ServerConfig {
            bind,
            database,
            store,
            karma,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store == StoreBackend::Postgres {
            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }
        }

        if !(1..=MAX_HISTORY_LIMIT).contains(&self.karma.history_page) {
            return Err(ConfigError::Invalid {
                var: "KARMA_HISTORY_PAGE".to_string(),
                reason: format!("Must be between 1 and {MAX_HISTORY_LIMIT}"),
            });
        }

        if let DemandMode::Fixed(adjustment) = self.karma.demand {
            if adjustment.abs() > MAX_DEMAND_ADJUSTMENT {
                return Err(ConfigError::Invalid {
                    var: "KARMA_DEMAND_ADJUSTMENT".to_string(),
                    reason: format!("Must be within ±{MAX_DEMAND_ADJUSTMENT}"),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from SERVER_BIND".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse an optional variable, failing if it is set but malformed
fn parse_env_required_format<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}

/// Parse a comma-separated list of account UUIDs
fn parse_operators(raw: &str) -> Result<Vec<AccountId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|e: uuid::Error| ConfigError::Invalid {
                var: "KARMA_OPERATOR_ACCOUNTS".to_string(),
                reason: format!("'{s}': {e}"),
            })
        })
        .collect()
}
