//! Preflight checks.
//!
//! Validates a rebalance plan against configured limits before any order
//! is placed. A single FAIL aborts the run; WARNs are printed and logged.

use rhfolio::plan::{Amount, totals};
use rhfolio::{AccountType, Cents, PortfolioSnapshot, Side, TargetAllocation, TradeAction};
use serde::Serialize;

use crate::config::Config;

/// Result of running all preflight checks.
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub checks: Vec<RiskCheck>,
}

/// A single check result.
#[derive(Debug, Clone, Serialize)]
pub struct RiskCheck {
    pub name: &'static str,
    pub status: RiskStatus,
    pub detail: String,
}

/// Whether a check passed, warned, or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskStatus {
    Pass,
    Warn,
    Fail,
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskStatus::Pass => write!(f, "PASS"),
            RiskStatus::Warn => write!(f, "WARN"),
            RiskStatus::Fail => write!(f, "FAIL"),
        }
    }
}

impl RiskReport {
    /// True if any check failed (not just warned).
    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|c| c.status == RiskStatus::Fail)
    }

    /// True if any check warned.
    pub fn has_warnings(&self) -> bool {
        self.checks.iter().any(|c| c.status == RiskStatus::Warn)
    }

    /// Details of failed checks, joined for an error message.
    pub fn failure_summary(&self) -> String {
        self.checks
            .iter()
            .filter(|c| c.status == RiskStatus::Fail)
            .map(|c| format!("{}: {}", c.name, c.detail))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl std::fmt::Display for RiskReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PREFLIGHT CHECKS:")?;
        for check in &self.checks {
            writeln!(f, "  [{}] {}: {}", check.status, check.name, check.detail)?;
        }
        Ok(())
    }
}

/// Run all preflight checks over a plan.
pub fn check_plan(
    actions: &[TradeAction],
    snapshot: &PortfolioSnapshot,
    target: &TargetAllocation,
    config: &Config,
) -> RiskReport {
    let mut checks = Vec::new();
    let t = totals(actions);

    // 1. Order count
    let max_orders = config.execution.max_orders_per_run;
    checks.push(RiskCheck {
        name: "Order count",
        status: if actions.len() > max_orders {
            RiskStatus::Fail
        } else {
            RiskStatus::Pass
        },
        detail: format!("{} orders (limit {max_orders})", actions.len()),
    });

    // 2. Funding: buys against buying power plus estimated sell proceeds.
    // Share sells are valued at the position's available equity.
    let share_proceeds: i64 = actions
        .iter()
        .filter(|a| a.side == Side::Sell)
        .filter_map(|a| match a.amount {
            Amount::Shares(_) => snapshot.get(&a.symbol).map(|p| p.available_value_cents()),
            Amount::Dollars(_) => None,
        })
        .sum();
    let available = snapshot.buying_power_cents() + t.sell_cents + share_proceeds;
    // Targets are rounded one at a time and weights may overshoot 100% by
    // the load tolerance, so buys can exceed capital by that much.
    let buy_count = actions.iter().filter(|a| a.side == Side::Buy).count() as i64;
    let overshoot = (target.total_weight() - 1.0).max(0.0);
    let slack =
        buy_count + (overshoot * snapshot.investable_capital_cents() as f64).ceil() as i64;
    let funding_status = if t.buy_cents <= available {
        RiskStatus::Pass
    } else if t.buy_cents <= available + slack {
        RiskStatus::Warn
    } else if snapshot.account_type() == AccountType::Margin {
        RiskStatus::Warn
    } else {
        RiskStatus::Fail
    };
    checks.push(RiskCheck {
        name: "Funding",
        status: funding_status,
        detail: format!(
            "buys {} vs {} available ({} buying power + {} sells)",
            Cents(t.buy_cents),
            Cents(available),
            Cents(snapshot.buying_power_cents()),
            Cents(t.sell_cents + share_proceeds),
        ),
    });

    // 3. Tiny dollar orders
    let min_cents = (config.risk.min_trade_usd * 100.0).round() as i64;
    let small: Vec<String> = actions
        .iter()
        .filter_map(|a| match a.amount {
            Amount::Dollars(c) if c < min_cents => Some(a.symbol.as_str().to_string()),
            _ => None,
        })
        .collect();
    checks.push(RiskCheck {
        name: "Min trade",
        status: if small.is_empty() {
            RiskStatus::Pass
        } else {
            RiskStatus::Warn
        },
        detail: if small.is_empty() {
            format!("all dollar orders >= {}", Cents(min_cents))
        } else {
            format!(
                "{} order(s) below {}: {}",
                small.len(),
                Cents(min_cents),
                small.join(", ")
            )
        },
    });

    // 4. Summary
    checks.push(RiskCheck {
        name: "Allocation",
        status: RiskStatus::Pass,
        detail: format!(
            "{} targets, buy {}, sell {} + {} full exit(s), {} account",
            target.len(),
            Cents(t.buy_cents),
            Cents(t.sell_cents),
            t.share_sells,
            snapshot.account_type(),
        ),
    });

    RiskReport { checks }
}
