//! Broker error types.

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("not logged in")]
    NotConnected,

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("watchlist not found: {0:?}")]
    WatchlistNotFound(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("failed to parse {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("{0}")]
    Other(String),
}
