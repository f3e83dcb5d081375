//! CURRENT→TARGET rebalance planner.
//!
//! Computes the trade actions needed to move a [`PortfolioSnapshot`] to the
//! dollar targets implied by a [`TargetAllocation`]. Pure computation: the
//! planner never talks to a broker.
//!
//! ```
//! use rhfolio::plan::{plan, Amount, MarginRatios};
//! use rhfolio::{AccountType, PortfolioSnapshot, Side, Symbol, TargetAllocation};
//!
//! let target = TargetAllocation::new(vec![
//!     (Symbol::new("AAA"), 0.6),
//!     (Symbol::new("BBB"), 0.4),
//! ])
//! .unwrap();
//! let current = PortfolioSnapshot::empty(AccountType::Cash, 1_000_00);
//!
//! let actions = plan(&current, &target, 1_000_00, &MarginRatios::default()).unwrap();
//! assert_eq!(actions.len(), 2);
//! assert_eq!(actions[0].side, Side::Buy);
//! assert_eq!(actions[0].amount, Amount::Dollars(600_00));
//! ```

use std::fmt;

use rustc_hash::FxHashMap;

use crate::allocation::TargetAllocation;
use crate::error::PlanError;
use crate::side::Side;
use crate::snapshot::{AccountType, PortfolioSnapshot};
use crate::types::{Cents, Symbol};

/// Gaps at or below this many cents are treated as already on target.
pub const EPSILON_CENTS: i64 = 1;

/// Size of a planned order.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Amount {
    /// Notional in cents (fractional-share order by price).
    Dollars(i64),
    /// Share quantity (fractional allowed).
    Shares(f64),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Dollars(cents) => write!(f, "{}", Cents(*cents)),
            Amount::Shares(qty) => write!(f, "{qty} sh"),
        }
    }
}

/// Why an action was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Reason {
    /// Held symbol no longer in the allocation.
    Divest,
    /// Target symbol not currently held.
    Open,
    /// Held below target.
    Increase,
    /// Held above target.
    Decrease,
    /// Sell-everything request.
    Liquidate,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::Divest => "divest",
            Reason::Open => "open",
            Reason::Increase => "increase",
            Reason::Decrease => "decrease",
            Reason::Liquidate => "liquidate",
        };
        f.pad(s)
    }
}

/// A single planned order. Consumed read-only by the executor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TradeAction {
    pub symbol: Symbol,
    pub side: Side,
    pub amount: Amount,
    /// Dollar level (cents) the symbol should sit at after this action.
    pub target_cents: i64,
    pub reason: Reason,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} of {} to reach {} ({})",
            self.side,
            self.amount,
            self.symbol,
            Cents(self.target_cents),
            self.reason
        )
    }
}

/// Per-symbol margin initial ratios for margin accounts.
#[derive(Debug, Clone, Default)]
pub struct MarginRatios {
    ratios: FxHashMap<Symbol, f64>,
}

impl MarginRatios {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol, ratio: f64) {
        self.ratios.insert(symbol, ratio);
    }

    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.ratios.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    /// Divisor applied to a symbol's nominal target.
    fn divisor(&self, account: AccountType, symbol: Symbol) -> Result<f64, PlanError> {
        if account == AccountType::Cash {
            return Ok(1.0);
        }
        let ratio = self
            .get(&symbol)
            .ok_or(PlanError::MissingMarginData { symbol })?;
        if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
            return Err(PlanError::InvalidMarginRatio { symbol, ratio });
        }
        Ok(ratio)
    }
}

impl FromIterator<(Symbol, f64)> for MarginRatios {
    fn from_iter<I: IntoIterator<Item = (Symbol, f64)>>(iter: I) -> Self {
        Self {
            ratios: iter.into_iter().collect(),
        }
    }
}

/// Dollar target for one symbol, in cents.
pub fn desired_cents(investable_cents: i64, weight: f64, margin_ratio: f64) -> i64 {
    (investable_cents as f64 * weight / margin_ratio).round() as i64
}

/// Compute the actions that move `current` to `target`.
///
/// - Held symbols missing from `target` are fully liquidated first (available
///   shares only), in symbol order.
/// - Each target symbol is then compared against its dollar target
///   `investable × weight / margin_ratio`; gaps beyond [`EPSILON_CENTS`] become
///   a buy or a sell, in allocation order.
///
/// Fails without producing any action if a position has collateral shares or
/// a margin account lacks a usable margin ratio for a target symbol.
pub fn plan(
    current: &PortfolioSnapshot,
    target: &TargetAllocation,
    investable_cents: i64,
    margin: &MarginRatios,
) -> Result<Vec<TradeAction>, PlanError> {
    let pledged = current.collateralized();
    if !pledged.is_empty() {
        return Err(PlanError::CollateralHeld { symbols: pledged });
    }

    let account = current.account_type();
    let divisors = target
        .symbols()
        .map(|sym| margin.divisor(account, sym))
        .collect::<Result<Vec<f64>, PlanError>>()?;

    let mut actions = Vec::new();

    // 1. Divest positions not in target
    for pos in current.positions() {
        if target.contains(&pos.symbol) || pos.available_shares <= 0.0 {
            continue;
        }
        actions.push(TradeAction {
            symbol: pos.symbol,
            side: Side::Sell,
            amount: Amount::Shares(pos.available_shares),
            target_cents: 0,
            reason: Reason::Divest,
        });
    }

    // 2. Move each target symbol to its dollar level
    for ((symbol, weight), divisor) in target.iter().zip(divisors) {
        let desired = desired_cents(investable_cents, weight, divisor);
        let held = current.get(&symbol);
        let held_cents = held.map_or(0, |p| p.equity_cents);
        let gap = desired - held_cents;

        if gap > EPSILON_CENTS {
            actions.push(TradeAction {
                symbol,
                side: Side::Buy,
                amount: Amount::Dollars(gap),
                target_cents: desired,
                reason: if held.is_some() {
                    Reason::Increase
                } else {
                    Reason::Open
                },
            });
        } else if gap < -EPSILON_CENTS {
            let Some(pos) = held else { continue };

            let amount = if desired <= 0 {
                if pos.available_shares <= 0.0 {
                    continue;
                }
                Amount::Shares(pos.available_shares)
            } else {
                let sell = (-gap).min(pos.available_value_cents());
                if sell <= 0 {
                    continue;
                }
                Amount::Dollars(sell)
            };

            actions.push(TradeAction {
                symbol,
                side: Side::Sell,
                amount,
                target_cents: desired.max(0),
                reason: Reason::Decrease,
            });
        }
    }

    Ok(actions)
}

/// Sell every available share of every position.
///
/// Collateral shares stay put; callers report them separately.
pub fn liquidate_all(current: &PortfolioSnapshot) -> Vec<TradeAction> {
    current
        .positions()
        .iter()
        .filter(|p| p.available_shares > 0.0)
        .map(|p| TradeAction {
            symbol: p.symbol,
            side: Side::Sell,
            amount: Amount::Shares(p.available_shares),
            target_cents: 0,
            reason: Reason::Liquidate,
        })
        .collect()
}

/// Summary totals for a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanTotals {
    /// Dollar buys, in cents.
    pub buy_cents: i64,
    /// Dollar sells, in cents (share-quantity sells excluded).
    pub sell_cents: i64,
    /// Number of share-quantity sells.
    pub share_sells: usize,
}

/// Tally buy and sell notionals across a plan.
pub fn totals(actions: &[TradeAction]) -> PlanTotals {
    let mut t = PlanTotals::default();
    for action in actions {
        match (action.side, action.amount) {
            (Side::Buy, Amount::Dollars(c)) => t.buy_cents += c,
            (Side::Sell, Amount::Dollars(c)) => t.sell_cents += c,
            (Side::Sell, Amount::Shares(_)) => t.share_sells += 1,
            (Side::Buy, Amount::Shares(_)) => {}
        }
    }
    t
}
