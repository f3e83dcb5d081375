//! Target allocation: validated symbol → weight mapping.

use rustc_hash::FxHashSet;

use crate::error::AllocationError;
use crate::types::Symbol;

/// Maximum distance between the weight total and 1.0.
pub const WEIGHT_TOLERANCE: f64 = 0.005;

/// Target weights for a rebalance, in allocation-file order.
///
/// Construction validates every invariant the planner relies on: at least one
/// entry, unique symbols, each weight a finite fraction in `[0, 1]`, and a
/// total within [`WEIGHT_TOLERANCE`] of 1.0. Once built it is immutable.
///
/// ```
/// use rhfolio::{Symbol, TargetAllocation};
///
/// let target = TargetAllocation::new(vec![
///     (Symbol::new("AAA"), 0.6),
///     (Symbol::new("BBB"), 0.4),
/// ])
/// .unwrap();
///
/// assert_eq!(target.len(), 2);
/// assert_eq!(target.weight(&Symbol::new("BBB")), Some(0.4));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TargetAllocation {
    entries: Vec<(Symbol, f64)>,
}

impl TargetAllocation {
    /// Validate and build an allocation from `(symbol, weight)` pairs.
    pub fn new(entries: Vec<(Symbol, f64)>) -> Result<Self, AllocationError> {
        if entries.is_empty() {
            return Err(AllocationError::Empty);
        }

        let mut seen = FxHashSet::default();
        for &(symbol, weight) in &entries {
            if !seen.insert(symbol) {
                return Err(AllocationError::DuplicateSymbol(symbol));
            }
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(AllocationError::InvalidWeight { symbol, weight });
            }
        }

        let total: f64 = entries.iter().map(|(_, w)| w).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(AllocationError::WeightSum { total });
        }

        Ok(Self { entries })
    }

    /// Check that the allocation covers exactly the symbols in `watchlist`.
    ///
    /// Fails with [`AllocationError::OutOfSync`] listing the symmetric
    /// difference, each side sorted.
    pub fn ensure_matches(&self, watchlist: &[Symbol]) -> Result<(), AllocationError> {
        let listed: Vec<Symbol> = self.symbols().collect();
        compare_symbols(&listed, watchlist)
    }

    /// Iterate `(symbol, weight)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Iterate symbols in allocation order.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.entries.iter().map(|(s, _)| *s)
    }

    /// Weight for `symbol`, if present.
    pub fn weight(&self, symbol: &Symbol) -> Option<f64> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, w)| *w)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.weight(symbol).is_some()
    }

    /// Sum of all weights (within tolerance of 1.0).
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compare allocation-file symbols against a watchlist.
///
/// Order and repeats are ignored. Fails with [`AllocationError::OutOfSync`]
/// listing the symmetric difference, each side sorted.
pub fn compare_symbols(file: &[Symbol], watchlist: &[Symbol]) -> Result<(), AllocationError> {
    let in_file: FxHashSet<Symbol> = file.iter().copied().collect();
    let listed: FxHashSet<Symbol> = watchlist.iter().copied().collect();

    let mut only_in_file: Vec<Symbol> = in_file.difference(&listed).copied().collect();
    let mut only_in_watchlist: Vec<Symbol> = listed.difference(&in_file).copied().collect();

    if only_in_file.is_empty() && only_in_watchlist.is_empty() {
        return Ok(());
    }

    only_in_file.sort();
    only_in_watchlist.sort();
    Err(AllocationError::OutOfSync {
        only_in_file,
        only_in_watchlist,
    })
}
