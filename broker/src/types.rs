//! Shared broker types: profiles, holdings, orders.

use std::fmt;

use rhfolio::{AccountType, Amount, Side, Symbol, TimeInForce};

/// Account summary from the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountProfile {
    pub account_number: String,
    pub buying_power_cents: i64,
    pub account_type: AccountType,
}

/// Portfolio valuation from the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioProfile {
    pub market_value_cents: i64,
    /// Present only while extended-hours trading is active.
    pub extended_hours_market_value_cents: Option<i64>,
    pub equity_cents: i64,
}

impl PortfolioProfile {
    /// Extended-hours market value when present, regular otherwise.
    pub fn current_market_value_cents(&self) -> i64 {
        self.extended_hours_market_value_cents
            .unwrap_or(self.market_value_cents)
    }
}

/// Broker-level position (share counts only; valued by the snapshot builder).
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: Symbol,
    pub quantity: f64,
    /// Shares free to sell.
    pub available_shares: f64,
    /// Shares pledged as options collateral.
    pub collateral_shares: f64,
}

/// Order to submit to a broker.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub amount: Amount,
    pub time_in_force: TimeInForce,
    pub extended_hours: bool,
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} of {} ({})", self.side, self.amount, self.symbol, self.time_in_force)?;
        if self.extended_hours {
            write!(f, " ext")?;
        }
        Ok(())
    }
}

/// Opaque order ID returned by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTicket {
    pub id: OrderId,
    /// Broker-reported state, e.g. `queued` or `confirmed`.
    pub state: String,
}

/// A working order that can still be cancelled.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: f64,
    pub state: String,
}
