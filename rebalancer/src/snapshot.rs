//! Build a [`PortfolioSnapshot`] from live broker data.

use log::{debug, info};
use rhfolio::{MarginRatios, PortfolioSnapshot, Position, TargetAllocation};
use rhfolio_broker::Brokerage;

use crate::error::Result;

/// Fetch account, portfolio and positions, and value each position at its
/// latest price.
///
/// Equity counts collateral shares too: they are part of the account's value
/// even though they cannot be sold. A zero market value yields an empty
/// snapshot, which is a fully-in-cash account rather than an error.
pub fn build_snapshot(broker: &dyn Brokerage) -> Result<PortfolioSnapshot> {
    let account = broker.account_profile()?;
    let portfolio = broker.portfolio_profile()?;
    let market_value = portfolio.current_market_value_cents();

    if market_value == 0 {
        info!("No market value; account is fully in cash");
        return Ok(PortfolioSnapshot::empty(
            account.account_type,
            account.buying_power_cents,
        ));
    }

    let holdings = broker.open_positions()?;
    let mut positions = Vec::with_capacity(holdings.len());
    for h in holdings {
        let price = broker.latest_price(&h.symbol)?;
        let shares = h.available_shares + h.collateral_shares;
        let equity = (price as f64 * shares).round() as i64;
        debug!("{}: {shares} sh @ {price}c = {equity}c", h.symbol);
        positions.push(Position {
            symbol: h.symbol,
            equity_cents: equity,
            available_shares: h.available_shares,
            collateral_shares: h.collateral_shares,
        });
    }

    Ok(PortfolioSnapshot::new(
        account.account_type,
        account.buying_power_cents,
        market_value,
        positions,
    ))
}

/// Margin initial ratios for every target symbol the broker publishes one for.
///
/// Symbols without a ratio are left out; the planner reports them.
pub fn fetch_margin_ratios(
    broker: &dyn Brokerage,
    target: &TargetAllocation,
) -> Result<MarginRatios> {
    let mut ratios = MarginRatios::new();
    for symbol in target.symbols() {
        if let Some(ratio) = broker.margin_initial_ratio(&symbol)? {
            ratios.insert(symbol, ratio);
        }
    }
    Ok(ratios)
}
