use rust_decimal::Decimal;

/// Server configuration
///
/// # Environment variables
///
/// Every setting can be overridden via environment variable:
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | /var/lib/depot | Working directory (database, logs) |
/// | ENVIRONMENT | development | Runtime environment |
/// | SWEEP_HOUR | 0 | Local hour (0-23) the daily balance sweep runs |
/// | TIMEZONE | Asia/Kolkata | IANA timezone for the sweep schedule |
/// | MIN_WALLET_BALANCE | -100 | Balance floor below which a store cannot operate |
/// | FANOUT_CHANNEL_CAPACITY | 1024 | Per-room broadcast buffer size |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/depot SWEEP_HOUR=3 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database and log files
    pub work_dir: String,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Local hour the daily sweep runs at
    pub sweep_hour: u32,
    /// IANA timezone name for the sweep schedule
    pub timezone: String,
    /// Minimum wallet balance for a store to operate
    pub min_wallet_balance: Decimal,
    /// Broadcast buffer size per fanout room
    pub fanout_channel_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/depot".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            sweep_hour: std::env::var("SWEEP_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|hour| *hour < 24)
                .unwrap_or(0),
            timezone: std::env::var("TIMEZONE").unwrap_or_else(|_| "Asia/Kolkata".into()),
            min_wallet_balance: std::env::var("MIN_WALLET_BALANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| Decimal::from(crate::gate::DEFAULT_MINIMUM_BALANCE)),
            fanout_channel_capacity: std::env::var("FANOUT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
        }
    }

    /// Override the working directory, useful in tests
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Path of the order/wallet database file
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("depot.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
