//! Portfolio snapshot: normalized view of the account at planning time.

use std::fmt;

use crate::types::{Cents, Symbol};

/// Brokerage account type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AccountType {
    #[default]
    Cash,
    Margin,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Cash => f.pad("cash"),
            AccountType::Margin => f.pad("margin"),
        }
    }
}

/// One held instrument.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub symbol: Symbol,
    /// Market value of all shares (available + collateral), in cents.
    pub equity_cents: i64,
    /// Shares that can be sold right now.
    pub available_shares: f64,
    /// Shares pledged as options collateral. Never sellable.
    pub collateral_shares: f64,
}

impl Position {
    pub fn total_shares(&self) -> f64 {
        self.available_shares + self.collateral_shares
    }

    /// Market value of the sellable portion, in cents.
    pub fn available_value_cents(&self) -> i64 {
        let total = self.total_shares();
        if total <= 0.0 {
            return 0;
        }
        if self.collateral_shares <= 0.0 {
            return self.equity_cents;
        }
        (self.equity_cents as f64 * self.available_shares / total).round() as i64
    }

    pub fn has_collateral(&self) -> bool {
        self.collateral_shares > 0.0
    }
}

/// Current account state: positions plus cash and account type.
///
/// Positions are kept sorted by symbol so every consumer sees a stable order.
/// A snapshot is built fresh for each run and never cached.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioSnapshot {
    positions: Vec<Position>,
    market_value_cents: i64,
    buying_power_cents: i64,
    account_type: AccountType,
}

impl PortfolioSnapshot {
    /// Build a snapshot. Later duplicates of a symbol replace earlier ones.
    pub fn new(
        account_type: AccountType,
        buying_power_cents: i64,
        market_value_cents: i64,
        positions: Vec<Position>,
    ) -> Self {
        let mut positions = positions;
        positions.reverse();
        positions.sort_by_key(|p| p.symbol);
        positions.dedup_by_key(|p| p.symbol);

        Self {
            positions,
            market_value_cents,
            buying_power_cents,
            account_type,
        }
    }

    /// An account with no holdings (fully in cash).
    pub fn empty(account_type: AccountType, buying_power_cents: i64) -> Self {
        Self::new(account_type, buying_power_cents, 0, Vec::new())
    }

    /// Snapshot whose market value is the sum of position equity.
    pub fn from_positions(
        account_type: AccountType,
        buying_power_cents: i64,
        positions: Vec<Position>,
    ) -> Self {
        let market_value = positions.iter().map(|p| p.equity_cents).sum();
        Self::new(account_type, buying_power_cents, market_value, positions)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions
            .binary_search_by_key(symbol, |p| p.symbol)
            .ok()
            .map(|i| &self.positions[i])
    }

    pub fn market_value_cents(&self) -> i64 {
        self.market_value_cents
    }

    pub fn buying_power_cents(&self) -> i64 {
        self.buying_power_cents
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// Buying power plus market value: the base for dollar targets.
    pub fn investable_capital_cents(&self) -> i64 {
        self.buying_power_cents + self.market_value_cents
    }

    /// Position's share of total market value, in percent.
    pub fn percentage(&self, symbol: &Symbol) -> f64 {
        match self.get(symbol) {
            Some(p) if self.market_value_cents > 0 => {
                p.equity_cents as f64 / self.market_value_cents as f64 * 100.0
            }
            _ => 0.0,
        }
    }

    /// Symbols with shares pledged as collateral, sorted.
    pub fn collateralized(&self) -> Vec<Symbol> {
        self.positions
            .iter()
            .filter(|p| p.has_collateral())
            .map(|p| p.symbol)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl fmt::Display for PortfolioSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Account ({}): {} market value, {} buying power",
            self.account_type,
            Cents(self.market_value_cents),
            Cents(self.buying_power_cents),
        )?;
        if self.positions.is_empty() {
            return writeln!(f, "  No holdings.");
        }
        for p in &self.positions {
            writeln!(
                f,
                "  {:8} {:>12} {:>7.2}%  avail {:>12.4}  collateral {:>10.4}",
                p.symbol,
                Cents(p.equity_cents),
                self.percentage(&p.symbol),
                p.available_shares,
                p.collateral_shares,
            )?;
        }
        Ok(())
    }
}
