//! Error types for the rebalancer.

use std::path::PathBuf;

use rhfolio::{AllocationError, PlanError};
use rhfolio_broker::BrokerError;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(
        "missing credentials: pass --credentials USER PASS TOTP or set ROBINHOOD_USERNAME, ROBINHOOD_PASSWORD and ROBINHOOD_TOTP (missing {0})"
    )]
    MissingCredentials(String),

    #[error(
        "no allocation file in {}: looked for {xlsx} and {csv}; run `rebalancer generate csv` or `rebalancer generate excel` first",
        .dir.display()
    )]
    AllocationMissing {
        dir: PathBuf,
        csv: String,
        xlsx: String,
    },

    #[error("failed to read allocation file {path}: {source}")]
    AllocationRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("allocation file error: {0}")]
    AllocationFile(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("spreadsheet write error: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("brokerage error: {0}")]
    Broker(#[from] BrokerError),

    #[error("preflight check failed: {0}")]
    RiskFailed(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error.
    ///
    /// - 2: validation failure (allocation, collateral, margin data, preflight)
    /// - 3: no allocation file yet
    /// - 1: everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::AllocationMissing { .. } => 3,
            Error::Allocation(_) | Error::Plan(_) | Error::RiskFailed(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rhfolio::Symbol;

    #[test]
    fn exit_codes() {
        let missing = Error::AllocationMissing {
            dir: PathBuf::from("/home/me"),
            csv: "Robinhood.csv".into(),
            xlsx: "Robinhood.xlsx".into(),
        };
        assert_eq!(missing.exit_code(), 3);
        assert_eq!(Error::from(AllocationError::WeightSum { total: 0.9 }).exit_code(), 2);
        assert_eq!(
            Error::from(PlanError::CollateralHeld { symbols: vec![Symbol::new("TSLA")] }).exit_code(),
            2
        );
        assert_eq!(Error::RiskFailed("too many orders".into()).exit_code(), 2);
        assert_eq!(Error::from(BrokerError::RateLimit).exit_code(), 1);
        assert_eq!(Error::Order("rejected".into()).exit_code(), 1);
    }

    #[test]
    fn missing_file_message_mentions_generate() {
        let e = Error::AllocationMissing {
            dir: PathBuf::from("/home/me"),
            csv: "Robinhood.csv".into(),
            xlsx: "Robinhood.xlsx".into(),
        };
        let s = e.to_string();
        assert!(s.contains("/home/me"));
        assert!(s.contains("rebalancer generate"));
    }
}
