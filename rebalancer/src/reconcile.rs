//! Allocation report: compare current holdings against target weights.
//!
//! Weights are measured against investable capital (buying power plus market
//! value), the same base the planner sizes targets from.

use rhfolio::{Cents, PortfolioSnapshot, Symbol, TargetAllocation};
use serde::Serialize;

/// Reconciliation report comparing actual vs target.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub entries: Vec<ReconcileEntry>,
    pub investable_cents: i64,
    pub tracking_error_pct: f64,
}

/// One symbol's reconciliation entry.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileEntry {
    pub symbol: Symbol,
    pub target_weight: f64,
    pub actual_weight: f64,
    pub diff_weight: f64,
    pub target_cents: i64,
    pub actual_cents: i64,
    /// Actual minus target, in cents. Positive means overweight.
    pub gap_cents: i64,
}

/// Compare a snapshot against target weights.
///
/// Covers every target symbol plus every held symbol outside the target
/// (target weight 0), sorted by symbol.
pub fn reconcile(snapshot: &PortfolioSnapshot, target: &TargetAllocation) -> ReconcileReport {
    let investable = snapshot.investable_capital_cents();

    let mut symbols: Vec<Symbol> = target.symbols().collect();
    symbols.extend(snapshot.positions().iter().map(|p| p.symbol));
    symbols.sort();
    symbols.dedup();

    let mut entries = Vec::with_capacity(symbols.len());
    let mut sum_sq_diff = 0.0_f64;

    for sym in &symbols {
        let target_weight = target.weight(sym).unwrap_or(0.0);
        let actual_cents = snapshot.get(sym).map_or(0, |p| p.equity_cents);
        let target_cents = (investable as f64 * target_weight).round() as i64;

        let actual_weight = if investable > 0 {
            actual_cents as f64 / investable as f64
        } else {
            0.0
        };

        let diff_weight = actual_weight - target_weight;
        sum_sq_diff += diff_weight * diff_weight;

        entries.push(ReconcileEntry {
            symbol: *sym,
            target_weight,
            actual_weight,
            diff_weight,
            target_cents,
            actual_cents,
            gap_cents: actual_cents - target_cents,
        });
    }

    let tracking_error_pct = (sum_sq_diff / symbols.len().max(1) as f64).sqrt() * 100.0;

    ReconcileReport {
        entries,
        investable_cents: investable,
        tracking_error_pct,
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ALLOCATION vs TARGET (investable {}):", Cents(self.investable_cents))?;
        writeln!(
            f,
            "  {:8} {:>10} {:>10} {:>10} {:>14} {:>14}",
            "Symbol", "Target%", "Actual%", "Diff%", "Actual", "Gap"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "  {:8} {:>9.2}% {:>9.2}% {:>+9.2}% {:>14} {:>14}",
                e.symbol.as_str(),
                e.target_weight * 100.0,
                e.actual_weight * 100.0,
                e.diff_weight * 100.0,
                Cents(e.actual_cents),
                Cents(e.gap_cents),
            )?;
        }
        writeln!(f, "\n  Tracking error: {:.3}%", self.tracking_error_pct)?;
        Ok(())
    }
}
