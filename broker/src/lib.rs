//! Brokerage trait and implementations for rhfolio.
//!
//! Provides a `Brokerage` trait covering exactly what a rebalance needs:
//! account and portfolio profiles, open positions, prices, margin data,
//! watchlists, and order placement/cancellation. Implementations:
//!
//! - **Robinhood** (feature `robinhood`): Robinhood REST API
//! - **Mock** (always available): in-memory broker for tests

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "robinhood")]
pub mod robinhood;

pub use error::BrokerError;
pub use types::*;

use rhfolio::Symbol;

/// An authenticated brokerage session.
pub trait Brokerage {
    /// Symbols of the named watchlist, in list order.
    fn watchlist(&self, name: &str) -> Result<Vec<Symbol>, BrokerError>;

    /// Account summary: buying power and account type.
    fn account_profile(&self) -> Result<AccountProfile, BrokerError>;

    /// Portfolio summary: market value and equity.
    fn portfolio_profile(&self) -> Result<PortfolioProfile, BrokerError>;

    /// All positions with a nonzero quantity.
    fn open_positions(&self) -> Result<Vec<Holding>, BrokerError>;

    /// Latest trade price in cents (extended-hours price when available).
    fn latest_price(&self, symbol: &Symbol) -> Result<i64, BrokerError>;

    /// Margin initial ratio for a symbol, if the broker publishes one.
    fn margin_initial_ratio(&self, symbol: &Symbol) -> Result<Option<f64>, BrokerError>;

    /// Submit an order.
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderTicket, BrokerError>;

    /// Cancel a working order.
    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError>;

    /// Orders that can still be cancelled.
    fn open_orders(&self) -> Result<Vec<OpenOrder>, BrokerError>;
}
