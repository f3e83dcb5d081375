//! Validation and planning errors.

use crate::types::Symbol;

/// Errors raised while building a [`TargetAllocation`](crate::TargetAllocation).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    #[error("allocation is empty")]
    Empty,

    #[error("duplicate symbol in allocation: {0}")]
    DuplicateSymbol(Symbol),

    #[error("weight for {symbol} ({weight}) must be a finite fraction in [0, 1]")]
    InvalidWeight { symbol: Symbol, weight: f64 },

    #[error("weights sum to {:.2}%, expected 100%", .total * 100.0)]
    WeightSum { total: f64 },

    #[error(
        "allocation file and watchlist are out of sync (only in file: [{}], only in watchlist: [{}])",
        join(.only_in_file),
        join(.only_in_watchlist)
    )]
    OutOfSync {
        only_in_file: Vec<Symbol>,
        only_in_watchlist: Vec<Symbol>,
    },
}

/// Errors raised by the rebalance planner.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("shares held as collateral in [{}]; cannot rebalance", join(.symbols))]
    CollateralHeld { symbols: Vec<Symbol> },

    #[error("margin initial ratio unavailable for {symbol}")]
    MissingMarginData { symbol: Symbol },

    #[error("margin initial ratio for {symbol} ({ratio}) must be in (0, 1]")]
    InvalidMarginRatio { symbol: Symbol, ratio: f64 },
}

fn join(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(Symbol::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
