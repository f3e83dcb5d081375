// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Edge-case tests: adversarial inputs to the allocation, snapshot and
//! planner APIs.

use rhfolio::plan::{liquidate_all, plan, totals, Amount, MarginRatios, Reason};
use rhfolio::{
    AccountType, AllocationError, Cents, PlanError, PortfolioSnapshot, Position, Side, Symbol,
    TargetAllocation,
};

fn aapl() -> Symbol {
    Symbol::new("AAPL")
}
fn msft() -> Symbol {
    Symbol::new("MSFT")
}
fn tsla() -> Symbol {
    Symbol::new("TSLA")
}

fn held(symbol: Symbol, equity_cents: i64, shares: f64) -> Position {
    Position {
        symbol,
        equity_cents,
        available_shares: shares,
        collateral_shares: 0.0,
    }
}

// ============================================================================
// Symbols
// ============================================================================

#[test]
fn symbol_normalizes_case_and_whitespace() {
    assert_eq!(Symbol::try_new("  aapl "), Some(aapl()));
    assert_eq!("brk.b".parse::<Symbol>().unwrap().as_str(), "BRK.B");
}

#[test]
fn symbol_rejects_garbage() {
    assert!(Symbol::try_new("").is_none());
    assert!(Symbol::try_new("   ").is_none());
    assert!(Symbol::try_new("TOOLONGSYM").is_none());
    assert!(Symbol::try_new("AA PL").is_none());
    assert!(Symbol::try_new("Total").is_some());
    assert!("$AAPL".parse::<Symbol>().is_err());
}

#[test]
#[should_panic(expected = "invalid symbol")]
fn symbol_new_panics_on_invalid() {
    let _ = Symbol::new("not a symbol");
}

// ============================================================================
// Money formatting
// ============================================================================

#[test]
fn cents_display_negative_and_small() {
    assert_eq!(format!("{}", Cents(5)), "$0.05");
    assert_eq!(format!("{}", Cents(-50)), "-$0.50");
    assert_eq!(format!("{}", Cents(-1_234_56)), "-$1234.56");
    assert_eq!(format!("{:>10}", Cents(1_00)), "     $1.00");
}

#[test]
fn cents_from_dollars_rounds() {
    assert_eq!(Cents::from_dollars(10.006), Cents(10_01));
    assert_eq!(Cents::from_dollars(0.004), Cents(0));
    assert_eq!(Cents::from_dollars(-2.5), Cents(-2_50));
}

// ============================================================================
// Allocation validation
// ============================================================================

#[test]
fn single_symbol_full_weight() {
    let target = TargetAllocation::new(vec![(aapl(), 1.0)]).unwrap();
    assert_eq!(target.len(), 1);
}

#[test]
fn all_zero_weights_rejected() {
    let err = TargetAllocation::new(vec![(aapl(), 0.0), (msft(), 0.0)]).unwrap_err();
    assert!(matches!(err, AllocationError::WeightSum { .. }));
}

#[test]
fn infinite_weight_rejected() {
    let err = TargetAllocation::new(vec![(aapl(), f64::INFINITY)]).unwrap_err();
    assert!(matches!(err, AllocationError::InvalidWeight { .. }));
}

#[test]
fn empty_watchlist_is_out_of_sync() {
    let target = TargetAllocation::new(vec![(aapl(), 1.0)]).unwrap();
    let err = target.ensure_matches(&[]).unwrap_err();
    assert_eq!(
        err,
        AllocationError::OutOfSync {
            only_in_file: vec![aapl()],
            only_in_watchlist: vec![],
        }
    );
}

#[test]
fn duplicate_watchlist_entries_still_in_sync() {
    let target = TargetAllocation::new(vec![(aapl(), 1.0)]).unwrap();
    assert!(target.ensure_matches(&[aapl(), aapl()]).is_ok());
}

// ============================================================================
// Planner boundaries
// ============================================================================

#[test]
fn zero_capital_plans_nothing() {
    let current = PortfolioSnapshot::empty(AccountType::Cash, 0);
    let target = TargetAllocation::new(vec![(aapl(), 0.5), (msft(), 0.5)]).unwrap();

    let actions = plan(&current, &target, 0, &MarginRatios::new()).unwrap();
    assert!(actions.is_empty());
}

#[test]
fn two_cent_gap_trades_one_cent_does_not() {
    let target = TargetAllocation::new(vec![(aapl(), 1.0)]).unwrap();

    let one = PortfolioSnapshot::from_positions(AccountType::Cash, 0, vec![held(aapl(), 99_99, 1.0)]);
    assert!(plan(&one, &target, 100_00, &MarginRatios::new()).unwrap().is_empty());

    let two = PortfolioSnapshot::from_positions(AccountType::Cash, 0, vec![held(aapl(), 99_98, 1.0)]);
    let actions = plan(&two, &target, 100_00, &MarginRatios::new()).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].amount, Amount::Dollars(2));
}

#[test]
fn divestitures_sorted_by_symbol() {
    let current = PortfolioSnapshot::from_positions(
        AccountType::Cash,
        0,
        vec![held(tsla(), 100_00, 1.0), held(msft(), 100_00, 1.0)],
    );
    let target = TargetAllocation::new(vec![(aapl(), 1.0)]).unwrap();

    let actions = plan(&current, &target, 200_00, &MarginRatios::new()).unwrap();
    let order: Vec<(Symbol, Reason)> = actions.iter().map(|a| (a.symbol, a.reason)).collect();
    assert_eq!(
        order,
        vec![
            (msft(), Reason::Divest),
            (tsla(), Reason::Divest),
            (aapl(), Reason::Open),
        ]
    );
}

#[test]
fn margin_error_reported_before_any_action() {
    let current = PortfolioSnapshot::from_positions(
        AccountType::Margin,
        0,
        vec![held(tsla(), 100_00, 1.0)],
    );
    let target = TargetAllocation::new(vec![(aapl(), 1.0)]).unwrap();

    let err = plan(&current, &target, 100_00, &MarginRatios::new()).unwrap_err();
    assert_eq!(err, PlanError::MissingMarginData { symbol: aapl() });
}

#[test]
fn negative_buying_power_shrinks_targets() {
    let current = PortfolioSnapshot::from_positions(
        AccountType::Margin,
        -200_00,
        vec![held(aapl(), 1_000_00, 10.0)],
    );
    let target = TargetAllocation::new(vec![(aapl(), 1.0)]).unwrap();
    let margin: MarginRatios = [(aapl(), 1.0)].into_iter().collect();

    let actions = plan(&current, &target, current.investable_capital_cents(), &margin).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].side, Side::Sell);
    assert_eq!(actions[0].amount, Amount::Dollars(200_00));
}

#[test]
fn liquidate_empty_account() {
    let current = PortfolioSnapshot::empty(AccountType::Cash, 500_00);
    assert!(liquidate_all(&current).is_empty());
    assert_eq!(totals(&[]).buy_cents, 0);
}

#[test]
fn liquidate_leaves_collateral() {
    let mut pledged = held(tsla(), 1_000_00, 5.0);
    pledged.collateral_shares = 5.0;
    let current = PortfolioSnapshot::from_positions(AccountType::Cash, 0, vec![pledged]);

    let actions = liquidate_all(&current);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].amount, Amount::Shares(5.0));
}
