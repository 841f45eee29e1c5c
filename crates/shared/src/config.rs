//! Application configuration management.
//!
//! Sources, later ones overriding earlier ones:
//! `config/default`, `config/{RUN_MODE}`, then `TESORO__SECTION__KEY`
//! environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Idempotency record retention and sweeping.
    #[serde(default)]
    pub idempotency: IdempotencySettings,
    /// Ledger reconciliation settings.
    #[serde(default)]
    pub ledger: LedgerSettings,
    /// Credit risk evaluation settings.
    #[serde(default)]
    pub credit: CreditSettings,
    /// Read cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key shared with the identity service.
    pub secret: String,
    /// Tolerated clock skew in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

fn default_leeway() -> u64 {
    30
}

/// Idempotency record lifecycle.
#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencySettings {
    /// How long a record blocks reuse of its key.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
    /// Age after which an IN_PROGRESS record is considered abandoned.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: i64,
    /// Interval of the supervisory sweep.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for IdempotencySettings {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            stale_after_secs: default_stale_after(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_retention_hours() -> i64 {
    48
}

fn default_stale_after() -> i64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

/// Ledger settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Largest tolerated gap between aggregate and materialized balance.
    #[serde(default = "default_epsilon")]
    pub reconciliation_epsilon: Decimal,
    /// Interval of the background reconciliation pass.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            reconciliation_epsilon: default_epsilon(),
            reconcile_interval_secs: default_reconcile_interval(),
        }
    }
}

fn default_epsilon() -> Decimal {
    Decimal::new(1, 2)
}

fn default_reconcile_interval() -> u64 {
    3600
}

/// Credit risk settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditSettings {
    /// Days past due before an invoice counts as overdue.
    #[serde(default = "default_grace_days")]
    pub grace_days: u32,
    /// Utilization percentage that triggers a warning.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold_percent: Decimal,
}

impl Default for CreditSettings {
    fn default() -> Self {
        Self {
            grace_days: default_grace_days(),
            alert_threshold_percent: default_alert_threshold(),
        }
    }
}

/// Longest grace window accepted from configuration.
pub const MAX_GRACE_DAYS: u32 = 3650;

fn default_grace_days() -> u32 {
    0
}

fn default_alert_threshold() -> Decimal {
    Decimal::from(80)
}

/// Bounded read cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of cached entries.
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    /// Entry time-to-live in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_cache_ttl() -> i64 {
    30
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TESORO").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that deserialize but make no sense.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the offending key.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.credit.grace_days > MAX_GRACE_DAYS {
            return Err(config::ConfigError::Message(format!(
                "credit.grace_days must be at most {MAX_GRACE_DAYS}, got {}",
                self.credit.grace_days
            )));
        }
        Ok(())
    }
}
