// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! # rhfolio
//!
//! Target-weight portfolio planning: validated allocations, account
//! snapshots, and the rebalance planner that turns the two into an ordered
//! list of buy/sell actions.
//!
//! The crate is pure computation. Fetching account state and placing orders
//! live in `rhfolio-broker` and `rhfolio-rebalancer`.
//!
//! ## Quick Start
//!
//! ```
//! use rhfolio::plan::{plan, Amount, MarginRatios, Reason};
//! use rhfolio::{AccountType, PortfolioSnapshot, Position, Side, Symbol, TargetAllocation};
//!
//! let target = TargetAllocation::new(vec![(Symbol::new("AAA"), 1.0)]).unwrap();
//!
//! let current = PortfolioSnapshot::from_positions(
//!     AccountType::Cash,
//!     0,
//!     vec![
//!         Position { symbol: Symbol::new("AAA"), equity_cents: 500_00, available_shares: 5.0, collateral_shares: 0.0 },
//!         Position { symbol: Symbol::new("BBB"), equity_cents: 300_00, available_shares: 3.0, collateral_shares: 0.0 },
//!     ],
//! );
//!
//! let actions = plan(&current, &target, current.investable_capital_cents(), &MarginRatios::new()).unwrap();
//!
//! // BBB is not in the target: sold first, by share count
//! assert_eq!(actions[0].reason, Reason::Divest);
//! assert_eq!(actions[0].amount, Amount::Shares(3.0));
//!
//! // AAA tops up from $500 to $800
//! assert_eq!(actions[1].side, Side::Buy);
//! assert_eq!(actions[1].amount, Amount::Dollars(300_00));
//! ```
//!
//! ## Money Representation
//!
//! Dollar amounts are `i64` cents; [`Cents`] formats them:
//!
//! ```
//! use rhfolio::Cents;
//!
//! assert_eq!(format!("{}", Cents(100_50)), "$100.50");
//! ```

pub mod allocation;
mod error;
pub mod plan;
mod side;
pub mod snapshot;
mod tif;
mod types;

pub use allocation::{TargetAllocation, WEIGHT_TOLERANCE, compare_symbols};
pub use error::{AllocationError, PlanError};
pub use plan::{Amount, MarginRatios, Reason, TradeAction};
pub use side::Side;
pub use snapshot::{AccountType, PortfolioSnapshot, Position};
pub use tif::TimeInForce;
pub use types::{Cents, Symbol};
