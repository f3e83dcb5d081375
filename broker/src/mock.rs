//! Mock broker for testing: implements the `Brokerage` trait with configurable behavior.
//!
//! Use this in integration tests to simulate broker responses without network calls.
//!
//! ```
//! use rhfolio::{AccountType, Symbol};
//! use rhfolio_broker::mock::{FillMode, MockBroker};
//! use rhfolio_broker::Brokerage;
//!
//! let broker = MockBroker::builder()
//!     .fill_mode(FillMode::Accept)
//!     .with_account(AccountType::Cash, 500_00)
//!     .with_position(Symbol::new("AAPL"), 10.0, 150_00)
//!     .with_watchlist("Portfolio", &[Symbol::new("AAPL")])
//!     .build();
//!
//! assert_eq!(broker.portfolio_profile().unwrap().market_value_cents, 1_500_00);
//! ```

use std::sync::{Mutex, MutexGuard};

use rhfolio::{AccountType, Amount, Side, Symbol, TimeInForce};
use rustc_hash::FxHashMap;

use crate::Brokerage;
use crate::error::BrokerError;
use crate::types::*;

/// How the mock broker handles submitted orders.
#[derive(Clone, Debug)]
pub enum FillMode {
    /// Every order is accepted.
    Accept,
    /// Every order is rejected.
    Reject,
    /// Orders for this symbol are rejected; others are accepted.
    RejectSymbol(Symbol),
}

/// A recorded order submission for assertion in tests.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedOrder {
    pub symbol: Symbol,
    pub side: Side,
    pub amount: Amount,
    pub time_in_force: TimeInForce,
    pub extended_hours: bool,
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    fill_mode: FillMode,
    account_type: AccountType,
    buying_power_cents: i64,
    market_value_cents: Option<i64>,
    extended_hours_market_value_cents: Option<i64>,
    holdings: Vec<Holding>,
    prices: FxHashMap<Symbol, i64>,
    margin_ratios: FxHashMap<Symbol, f64>,
    watchlists: Vec<(String, Vec<Symbol>)>,
    open_orders: Vec<OpenOrder>,
}

impl MockBrokerBuilder {
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_account(mut self, account_type: AccountType, buying_power_cents: i64) -> Self {
        self.account_type = account_type;
        self.buying_power_cents = buying_power_cents;
        self
    }

    /// Override the reported market value (defaults to the sum of positions).
    pub fn with_market_value(mut self, cents: i64) -> Self {
        self.market_value_cents = Some(cents);
        self
    }

    pub fn with_extended_hours_market_value(mut self, cents: i64) -> Self {
        self.extended_hours_market_value_cents = Some(cents);
        self
    }

    /// Fully sellable position of `shares` at `price_cents`.
    pub fn with_position(self, symbol: Symbol, shares: f64, price_cents: i64) -> Self {
        self.with_collateral_position(symbol, shares, 0.0, price_cents)
    }

    /// Position split between sellable and collateral shares.
    pub fn with_collateral_position(
        mut self,
        symbol: Symbol,
        available: f64,
        collateral: f64,
        price_cents: i64,
    ) -> Self {
        self.holdings.push(Holding {
            symbol,
            quantity: available + collateral,
            available_shares: available,
            collateral_shares: collateral,
        });
        self.prices.insert(symbol, price_cents);
        self
    }

    pub fn with_price(mut self, symbol: Symbol, price_cents: i64) -> Self {
        self.prices.insert(symbol, price_cents);
        self
    }

    pub fn with_margin_ratio(mut self, symbol: Symbol, ratio: f64) -> Self {
        self.margin_ratios.insert(symbol, ratio);
        self
    }

    pub fn with_watchlist(mut self, name: &str, symbols: &[Symbol]) -> Self {
        self.watchlists.push((name.to_string(), symbols.to_vec()));
        self
    }

    pub fn with_open_order(mut self, id: &str, symbol: Symbol, side: Side, quantity: f64) -> Self {
        self.open_orders.push(OpenOrder {
            id: OrderId(id.to_string()),
            symbol,
            side,
            quantity,
            state: "queued".to_string(),
        });
        self
    }

    pub fn build(self) -> MockBroker {
        let market_value_cents = self.market_value_cents.unwrap_or_else(|| {
            self.holdings
                .iter()
                .map(|h| {
                    let price = self.prices.get(&h.symbol).copied().unwrap_or(0);
                    (price as f64 * h.quantity).round() as i64
                })
                .sum()
        });

        MockBroker {
            fill_mode: self.fill_mode,
            account_type: self.account_type,
            buying_power_cents: self.buying_power_cents,
            market_value_cents,
            extended_hours_market_value_cents: self.extended_hours_market_value_cents,
            holdings: self.holdings,
            prices: self.prices,
            margin_ratios: self.margin_ratios,
            watchlists: self.watchlists,
            open_orders: Mutex::new(self.open_orders),
            next_order_id: Mutex::new(1),
            submitted_orders: Mutex::new(Vec::new()),
            cancelled_orders: Mutex::new(Vec::new()),
        }
    }
}

/// A mock broker that records submitted orders and returns configurable responses.
pub struct MockBroker {
    fill_mode: FillMode,
    account_type: AccountType,
    buying_power_cents: i64,
    market_value_cents: i64,
    extended_hours_market_value_cents: Option<i64>,
    holdings: Vec<Holding>,
    prices: FxHashMap<Symbol, i64>,
    margin_ratios: FxHashMap<Symbol, f64>,
    watchlists: Vec<(String, Vec<Symbol>)>,
    open_orders: Mutex<Vec<OpenOrder>>,
    next_order_id: Mutex<u64>,
    submitted_orders: Mutex<Vec<RecordedOrder>>,
    cancelled_orders: Mutex<Vec<OrderId>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            fill_mode: FillMode::Accept,
            account_type: AccountType::Cash,
            buying_power_cents: 0,
            market_value_cents: None,
            extended_hours_market_value_cents: None,
            holdings: Vec::new(),
            prices: FxHashMap::default(),
            margin_ratios: FxHashMap::default(),
            watchlists: Vec::new(),
            open_orders: Vec::new(),
        }
    }

    /// Get all orders that were submitted (for assertion in tests).
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        lock(&self.submitted_orders).clone()
    }

    /// IDs of orders cancelled through this broker.
    pub fn cancelled_orders(&self) -> Vec<OrderId> {
        lock(&self.cancelled_orders).clone()
    }
}

impl Brokerage for MockBroker {
    fn watchlist(&self, name: &str) -> Result<Vec<Symbol>, BrokerError> {
        self.watchlists
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, symbols)| symbols.clone())
            .ok_or_else(|| BrokerError::WatchlistNotFound(name.to_string()))
    }

    fn account_profile(&self) -> Result<AccountProfile, BrokerError> {
        Ok(AccountProfile {
            account_number: "MOCK0001".to_string(),
            buying_power_cents: self.buying_power_cents,
            account_type: self.account_type,
        })
    }

    fn portfolio_profile(&self) -> Result<PortfolioProfile, BrokerError> {
        Ok(PortfolioProfile {
            market_value_cents: self.market_value_cents,
            extended_hours_market_value_cents: self.extended_hours_market_value_cents,
            equity_cents: self.market_value_cents + self.buying_power_cents,
        })
    }

    fn open_positions(&self) -> Result<Vec<Holding>, BrokerError> {
        Ok(self.holdings.clone())
    }

    fn latest_price(&self, symbol: &Symbol) -> Result<i64, BrokerError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| BrokerError::InvalidSymbol(symbol.as_str().to_string()))
    }

    fn margin_initial_ratio(&self, symbol: &Symbol) -> Result<Option<f64>, BrokerError> {
        Ok(self.margin_ratios.get(symbol).copied())
    }

    fn submit_order(&self, order: &OrderRequest) -> Result<OrderTicket, BrokerError> {
        // Record the order
        lock(&self.submitted_orders).push(RecordedOrder {
            symbol: order.symbol,
            side: order.side,
            amount: order.amount,
            time_in_force: order.time_in_force,
            extended_hours: order.extended_hours,
        });

        let rejected = match &self.fill_mode {
            FillMode::Accept => false,
            FillMode::Reject => true,
            FillMode::RejectSymbol(s) => *s == order.symbol,
        };
        if rejected {
            return Err(BrokerError::Order(format!(
                "mock: {} order for {} rejected",
                order.side.as_str(),
                order.symbol
            )));
        }

        let mut next = lock(&self.next_order_id);
        let id = OrderId(format!("mock-{next}"));
        *next += 1;
        Ok(OrderTicket {
            id,
            state: "queued".to_string(),
        })
    }

    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError> {
        let mut open = lock(&self.open_orders);
        let Some(idx) = open.iter().position(|o| &o.id == id) else {
            return Err(BrokerError::Order(format!("mock: no open order {id}")));
        };
        open.remove(idx);
        lock(&self.cancelled_orders).push(id.clone());
        Ok(())
    }

    fn open_orders(&self) -> Result<Vec<OpenOrder>, BrokerError> {
        Ok(lock(&self.open_orders).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aapl() -> Symbol {
        Symbol::new("AAPL")
    }
    fn msft() -> Symbol {
        Symbol::new("MSFT")
    }

    fn buy(symbol: Symbol, cents: i64) -> OrderRequest {
        OrderRequest {
            symbol,
            side: Side::Buy,
            amount: Amount::Dollars(cents),
            time_in_force: TimeInForce::GFD,
            extended_hours: true,
        }
    }

    #[test]
    fn builder_basic() {
        let broker = MockBroker::builder()
            .with_account(AccountType::Margin, 250_00)
            .with_position(aapl(), 10.0, 150_00)
            .with_margin_ratio(aapl(), 0.5)
            .build();

        let positions = broker.open_positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].symbol, aapl());
        assert_eq!(positions[0].available_shares, 10.0);

        let account = broker.account_profile().unwrap();
        assert_eq!(account.account_type, AccountType::Margin);
        assert_eq!(account.buying_power_cents, 250_00);

        assert_eq!(broker.portfolio_profile().unwrap().market_value_cents, 1_500_00);
        assert_eq!(broker.latest_price(&aapl()).unwrap(), 150_00);
        assert_eq!(broker.margin_initial_ratio(&aapl()).unwrap(), Some(0.5));
        assert_eq!(broker.margin_initial_ratio(&msft()).unwrap(), None);
    }

    #[test]
    fn unknown_price_errors() {
        let broker = MockBroker::builder().build();
        assert!(matches!(
            broker.latest_price(&aapl()),
            Err(BrokerError::InvalidSymbol(_))
        ));
    }

    #[test]
    fn missing_watchlist_errors() {
        let broker = MockBroker::builder()
            .with_watchlist("Portfolio", &[aapl()])
            .build();
        assert_eq!(broker.watchlist("Portfolio").unwrap(), vec![aapl()]);
        assert!(matches!(
            broker.watchlist("Other"),
            Err(BrokerError::WatchlistNotFound(_))
        ));
    }

    #[test]
    fn submit_records_orders() {
        let broker = MockBroker::builder().build();

        let first = broker.submit_order(&buy(aapl(), 100_00)).unwrap();
        let second = broker.submit_order(&buy(msft(), 50_00)).unwrap();
        assert_eq!(first.id, OrderId("mock-1".into()));
        assert_eq!(second.id, OrderId("mock-2".into()));

        let recorded = broker.submitted_orders();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].symbol, aapl());
        assert_eq!(recorded[0].amount, Amount::Dollars(100_00));
    }

    #[test]
    fn reject_mode() {
        let broker = MockBroker::builder().fill_mode(FillMode::Reject).build();
        assert!(broker.submit_order(&buy(aapl(), 100_00)).is_err());
        // Rejected orders are still recorded
        assert_eq!(broker.submitted_orders().len(), 1);
    }

    #[test]
    fn reject_single_symbol() {
        let broker = MockBroker::builder()
            .fill_mode(FillMode::RejectSymbol(msft()))
            .build();
        assert!(broker.submit_order(&buy(aapl(), 100_00)).is_ok());
        assert!(broker.submit_order(&buy(msft(), 100_00)).is_err());
    }

    #[test]
    fn cancel_removes_open_order() {
        let broker = MockBroker::builder()
            .with_open_order("o1", aapl(), Side::Buy, 1.0)
            .with_open_order("o2", msft(), Side::Sell, 2.0)
            .build();

        broker.cancel_order(&OrderId("o1".into())).unwrap();
        assert_eq!(broker.open_orders().unwrap().len(), 1);
        assert_eq!(broker.cancelled_orders(), vec![OrderId("o1".into())]);
        assert!(broker.cancel_order(&OrderId("o1".into())).is_err());
    }
}
