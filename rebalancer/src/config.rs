//! TOML configuration loading and validation.
//!
//! Every field has a default, so an absent file (or an absent section) yields
//! the stock behaviour: 5 s between orders, a 30 s pause every 10 orders,
//! good-for-day extended-hours orders, and files in the home directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rhfolio::TimeInForce;
use rhfolio_broker::robinhood::Credentials;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rebalancer.toml";

pub const ENV_USERNAME: &str = "ROBINHOOD_USERNAME";
pub const ENV_PASSWORD: &str = "ROBINHOOD_PASSWORD";
pub const ENV_TOTP: &str = "ROBINHOOD_TOTP";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.robinhood.com".into()
}
fn default_timeout() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Watchlist whose symbols must match the allocation file.
    #[serde(default = "default_watchlist")]
    pub watchlist: String,
}

fn default_watchlist() -> String {
    "Portfolio".into()
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            watchlist: default_watchlist(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllocationConfig {
    /// Directory holding the allocation file. Defaults to the home directory
    /// (`Documents` under it on Windows).
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_csv_file")]
    pub csv_file: String,
    #[serde(default = "default_xlsx_file")]
    pub xlsx_file: String,
}

fn default_csv_file() -> String {
    "Robinhood.csv".into()
}
fn default_xlsx_file() -> String {
    "Robinhood.xlsx".into()
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            dir: None,
            csv_file: default_csv_file(),
            xlsx_file: default_xlsx_file(),
        }
    }
}

/// What to do when a single order fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderErrorPolicy {
    /// Log the failure and move on to the next order.
    #[default]
    Continue,
    /// Stop submitting and fail the run.
    Abort,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_interval")]
    pub order_interval_ms: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_pause")]
    pub batch_pause_secs: u64,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    #[serde(default = "default_true")]
    pub extended_hours: bool,
    #[serde(default)]
    pub on_order_error: OrderErrorPolicy,
    #[serde(default = "default_max_orders")]
    pub max_orders_per_run: usize,
}

fn default_interval() -> u64 {
    5_000
}
fn default_batch_size() -> usize {
    10
}
fn default_batch_pause() -> u64 {
    30
}
fn default_cooldown() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_max_orders() -> usize {
    100
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            order_interval_ms: default_interval(),
            batch_size: default_batch_size(),
            batch_pause_secs: default_batch_pause(),
            cooldown_secs: default_cooldown(),
            time_in_force: TimeInForce::default(),
            extended_hours: default_true(),
            on_order_error: OrderErrorPolicy::default(),
            max_orders_per_run: default_max_orders(),
        }
    }
}

impl ExecutionConfig {
    /// No sleeps anywhere; for tests and dry scripting.
    pub fn unpaced() -> Self {
        Self {
            order_interval_ms: 0,
            batch_pause_secs: 0,
            cooldown_secs: 0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Dollar orders below this size draw a preflight warning.
    #[serde(default = "default_min_trade")]
    pub min_trade_usd: f64,
}

fn default_min_trade() -> f64 {
    1.0
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_trade_usd: default_min_trade(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_audit_file() -> String {
    "rebalancer-audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given (it must exist); otherwise load
    /// [`DEFAULT_CONFIG_FILE`] when present, else use defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        let url = &self.connection.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base_url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.connection.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be > 0".into()));
        }
        if self.account.watchlist.trim().is_empty() {
            return Err(Error::Config("watchlist must not be empty".into()));
        }
        if self.allocation.csv_file.is_empty() || self.allocation.xlsx_file.is_empty() {
            return Err(Error::Config("allocation file names must not be empty".into()));
        }
        if self.execution.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".into()));
        }
        if self.execution.max_orders_per_run == 0 {
            return Err(Error::Config("max_orders_per_run must be > 0".into()));
        }
        let min_trade = self.risk.min_trade_usd;
        if min_trade.is_nan() || min_trade < 0.0 {
            return Err(Error::Config("min_trade_usd must be >= 0".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout_secs)
    }

    /// Directory holding the allocation file.
    pub fn allocation_dir(&self) -> Result<PathBuf> {
        match &self.allocation.dir {
            Some(dir) => Ok(dir.clone()),
            None => default_documents_dir(),
        }
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> Result<PathBuf> {
        let dir = match &self.logging.dir {
            Some(dir) => dir.clone(),
            None => home_dir()?,
        };
        Ok(dir.join(&self.logging.audit_file))
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| Error::Config("cannot determine home directory".into()))
}

/// Home directory, or `Documents` under it on Windows.
pub fn default_documents_dir() -> Result<PathBuf> {
    let home = home_dir()?;
    if cfg!(windows) {
        Ok(home.join("Documents"))
    } else {
        Ok(home)
    }
}

/// Resolve login credentials: explicit `[user, pass, totp]` first, then the
/// environment via `env`.
pub fn credentials_from(
    cli: Option<&[String]>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Credentials> {
    if let Some(args) = cli {
        return match args {
            [user, pass, totp] => Ok(Credentials::new(user, pass, totp)),
            _ => Err(Error::Config(
                "--credentials takes exactly USER PASS TOTP".into(),
            )),
        };
    }

    let var = |name: &str| {
        env(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::MissingCredentials(name.to_string()))
    };
    let user = var(ENV_USERNAME)?;
    let pass = var(ENV_PASSWORD)?;
    let totp = var(ENV_TOTP)?;
    Ok(Credentials::new(&user, &pass, &totp))
}

/// Resolve login credentials from the command line or process environment.
pub fn credentials(cli: Option<&[String]>) -> Result<Credentials> {
    credentials_from(cli, |name| std::env::var(name).ok())
}
