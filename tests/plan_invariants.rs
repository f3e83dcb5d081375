// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Property-based tests for planner invariants.
//!
//! Random allocations and holdings; each property must hold for every plan the
//! planner returns.

use rhfolio::plan::{desired_cents, plan, Amount, MarginRatios, Reason};
use rhfolio::{AccountType, PlanError, PortfolioSnapshot, Position, Side, Symbol, TargetAllocation};
use proptest::prelude::*;

fn sym(i: usize) -> Symbol {
    Symbol::new(&format!("S{i:03}"))
}

/// Raw weights normalized to sum to 1.0 over symbols `S000..`.
fn allocation_strategy() -> impl Strategy<Value = TargetAllocation> {
    prop::collection::vec(1u32..=100, 1..12).prop_map(|raw| {
        let sum: u32 = raw.iter().sum();
        let entries = raw
            .iter()
            .enumerate()
            .map(|(i, &r)| (sym(i), r as f64 / sum as f64))
            .collect();
        TargetAllocation::new(entries).unwrap()
    })
}

/// Holdings over symbols `S000..S019`, some inside the target and some not.
fn holdings_strategy() -> impl Strategy<Value = Vec<Position>> {
    prop::collection::btree_map(0usize..20, (0i64..=100_000_00, 1u32..=1_000), 0..15).prop_map(
        |held| {
            held.into_iter()
                .map(|(i, (equity, shares))| Position {
                    symbol: sym(i),
                    equity_cents: equity,
                    available_shares: shares as f64,
                    collateral_shares: 0.0,
                })
                .collect()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ========================================================================
    // FIXED POINT
    // ========================================================================

    /// A portfolio already sitting at every dollar target produces no actions.
    #[test]
    fn on_target_portfolio_is_fixed_point(
        target in allocation_strategy(),
        investable in 0i64..=10_000_000_00,
    ) {
        let positions = target
            .iter()
            .map(|(symbol, w)| Position {
                symbol,
                equity_cents: desired_cents(investable, w, 1.0),
                available_shares: 1.0,
                collateral_shares: 0.0,
            })
            .collect();
        let current = PortfolioSnapshot::from_positions(AccountType::Cash, 0, positions);

        let actions = plan(&current, &target, investable, &MarginRatios::new()).unwrap();
        prop_assert!(actions.is_empty(), "expected no actions, got {:?}", actions);
    }

    // ========================================================================
    // DIVESTITURE
    // ========================================================================

    /// Every sellable holding outside the target is divested exactly once, and
    /// all divestitures precede every other action.
    #[test]
    fn divestitures_once_and_first(
        target in allocation_strategy(),
        positions in holdings_strategy(),
        buying_power in 0i64..=1_000_000_00,
    ) {
        let current = PortfolioSnapshot::from_positions(AccountType::Cash, buying_power, positions);
        let actions = plan(&current, &target, current.investable_capital_cents(), &MarginRatios::new()).unwrap();

        for pos in current.positions() {
            let divests = actions
                .iter()
                .filter(|a| a.symbol == pos.symbol && a.reason == Reason::Divest)
                .count();
            let expected = usize::from(!target.contains(&pos.symbol) && pos.available_shares > 0.0);
            prop_assert_eq!(divests, expected, "symbol {}", pos.symbol);
        }

        let first_other = actions.iter().position(|a| a.reason != Reason::Divest).unwrap_or(actions.len());
        prop_assert!(actions[first_other..].iter().all(|a| a.reason != Reason::Divest));
    }

    // ========================================================================
    // ACTION SHAPE
    // ========================================================================

    /// Buys are dollar amounts above epsilon; dollar sells never exceed what
    /// is held; no symbol gets two actions.
    #[test]
    fn actions_are_well_formed(
        target in allocation_strategy(),
        positions in holdings_strategy(),
        buying_power in 0i64..=1_000_000_00,
    ) {
        let current = PortfolioSnapshot::from_positions(AccountType::Cash, buying_power, positions);
        let actions = plan(&current, &target, current.investable_capital_cents(), &MarginRatios::new()).unwrap();

        for a in &actions {
            match (a.side, a.amount) {
                (Side::Buy, Amount::Dollars(c)) => prop_assert!(c > 1),
                (Side::Buy, Amount::Shares(_)) => prop_assert!(false, "share-quantity buy"),
                (Side::Sell, Amount::Dollars(c)) => {
                    let held = current.get(&a.symbol).map_or(0, |p| p.equity_cents);
                    prop_assert!(c > 0 && c <= held);
                }
                (Side::Sell, Amount::Shares(q)) => {
                    let avail = current.get(&a.symbol).map_or(0.0, |p| p.available_shares);
                    prop_assert!(q > 0.0 && q <= avail);
                }
            }
        }

        let mut seen: Vec<Symbol> = actions.iter().map(|a| a.symbol).collect();
        seen.sort();
        let before = seen.len();
        seen.dedup();
        prop_assert_eq!(before, seen.len());
    }

    /// Applying a plan lands every target symbol within a cent of its dollar
    /// target whenever holdings can be sold by dollars.
    #[test]
    fn plan_converges_to_targets(
        target in allocation_strategy(),
        positions in holdings_strategy(),
        buying_power in 0i64..=1_000_000_00,
    ) {
        let current = PortfolioSnapshot::from_positions(AccountType::Cash, buying_power, positions);
        let investable = current.investable_capital_cents();
        let actions = plan(&current, &target, investable, &MarginRatios::new()).unwrap();

        for (symbol, w) in target.iter() {
            let desired = desired_cents(investable, w, 1.0);
            let mut after = current.get(&symbol).map_or(0, |p| p.equity_cents);
            for a in actions.iter().filter(|a| a.symbol == symbol) {
                match (a.side, a.amount) {
                    (Side::Buy, Amount::Dollars(c)) => after += c,
                    (Side::Sell, Amount::Dollars(c)) => after -= c,
                    (Side::Sell, Amount::Shares(_)) => after = 0,
                    (Side::Buy, Amount::Shares(_)) => {}
                }
            }
            prop_assert!((after - desired).abs() <= 1, "{}: after={} desired={}", symbol, after, desired);
        }
    }

    // ========================================================================
    // SAFETY
    // ========================================================================

    /// Any collateral anywhere in the account blocks the whole plan.
    #[test]
    fn collateral_always_fails(
        target in allocation_strategy(),
        positions in holdings_strategy(),
        pledged in 1u32..=100,
    ) {
        let mut positions = positions;
        positions.push(Position {
            symbol: Symbol::new("PLEDGED"),
            equity_cents: 1_000_00,
            available_shares: 0.0,
            collateral_shares: pledged as f64,
        });
        let current = PortfolioSnapshot::from_positions(AccountType::Cash, 0, positions);

        let result = plan(&current, &target, current.investable_capital_cents(), &MarginRatios::new());
        prop_assert!(matches!(result, Err(PlanError::CollateralHeld { .. })), "collateral must block planning");
    }

    /// Margin targets are the cash targets divided by each symbol's ratio.
    #[test]
    fn margin_scales_targets(
        target in allocation_strategy(),
        investable in 0i64..=1_000_000_00,
        ratio_pct in 10u32..=100,
    ) {
        let ratio = ratio_pct as f64 / 100.0;
        let margin: MarginRatios = target.symbols().map(|s| (s, ratio)).collect();
        let current = PortfolioSnapshot::empty(AccountType::Margin, investable);

        let actions = plan(&current, &target, investable, &margin).unwrap();
        for a in &actions {
            let w = target.weight(&a.symbol).unwrap();
            prop_assert_eq!(a.target_cents, desired_cents(investable, w, ratio));
        }
    }
}
