//! Execution orchestrator: plan → preflight → confirm → execute → report.
//!
//! [`execute`] is the order executor; the workflow functions below tie it
//! together with the snapshot builder, planner and reports.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use rhfolio::plan::{self, MarginRatios};
use rhfolio::{AccountType, Cents, Side, TargetAllocation, TradeAction};
use rhfolio_broker::{Brokerage, OrderRequest};

use crate::allocation::{self, AllocationFormat};
use crate::audit::{self, AuditLog};
use crate::config::{Config, ExecutionConfig, OrderErrorPolicy};
use crate::error::{Error, Result};
use crate::reconcile;
use crate::risk;
use crate::session::{Session, locate_allocation};
use crate::snapshot::{build_snapshot, fetch_margin_ratios};

/// Counts from one pass of the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Orders sent to the broker (accepted or not).
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Actions logged instead of placed.
    pub simulated: usize,
}

/// Which open orders to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OrderFilter {
    All,
    Buy,
    Sell,
}

impl OrderFilter {
    pub fn matches(self, side: Side) -> bool {
        match self {
            OrderFilter::All => true,
            OrderFilter::Buy => side == Side::Buy,
            OrderFilter::Sell => side == Side::Sell,
        }
    }
}

/// Delay after the `n`th order (1-based): the order interval, plus the
/// batch pause after every `batch_size` orders.
pub fn pause_after(n: usize, cfg: &ExecutionConfig) -> Duration {
    let mut pause = Duration::from_millis(cfg.order_interval_ms);
    if cfg.batch_size > 0 && n % cfg.batch_size == 0 {
        pause += Duration::from_secs(cfg.batch_pause_secs);
    }
    pause
}

/// Broker order for a planned action.
pub fn order_request(action: &TradeAction, cfg: &ExecutionConfig) -> OrderRequest {
    OrderRequest {
        symbol: action.symbol,
        side: action.side,
        amount: action.amount,
        time_in_force: cfg.time_in_force,
        extended_hours: cfg.extended_hours,
    }
}

/// Submit `actions` in order.
///
/// In simulate mode every action is logged with a `SIMULATION:` prefix and
/// nothing reaches the broker. Live orders are paced per [`pause_after`];
/// a failed order is logged and skipped, or aborts the run under
/// [`OrderErrorPolicy::Abort`]. Audit writes here are best-effort: once
/// orders are going out, a failing audit file is warned about, not fatal.
pub fn execute(
    broker: &dyn Brokerage,
    actions: &[TradeAction],
    simulate: bool,
    cfg: &ExecutionConfig,
    audit: &mut AuditLog,
) -> Result<ExecutionSummary> {
    let mut summary = ExecutionSummary::default();

    if simulate {
        for action in actions {
            info!("SIMULATION: {action}");
            audit_or_warn(audit::log_order_simulated(audit, action));
            summary.simulated += 1;
        }
        return Ok(summary);
    }

    if cfg.time_in_force.persists() && !actions.is_empty() {
        info!(
            "{} orders stay working until filled or cancelled (`rebalancer cancel`)",
            cfg.time_in_force
        );
    }

    for (i, action) in actions.iter().enumerate() {
        let request = order_request(action, cfg);
        summary.submitted += 1;

        match broker.submit_order(&request) {
            Ok(ticket) => {
                info!(
                    "[{}/{}] {request}: order {} {}",
                    i + 1,
                    actions.len(),
                    ticket.id,
                    ticket.state
                );
                audit_or_warn(audit::log_order_submitted(audit, action, &ticket));
                summary.succeeded += 1;
            }
            Err(e) => {
                error!("[{}/{}] {request} failed: {e}", i + 1, actions.len());
                audit_or_warn(audit::log_order_failed(audit, action, &e.to_string()));
                summary.failed += 1;
                if cfg.on_order_error == OrderErrorPolicy::Abort {
                    return Err(Error::Order(format!(
                        "{} {} failed after {} of {} orders: {e}",
                        action.side,
                        action.symbol,
                        i,
                        actions.len()
                    )));
                }
            }
        }

        if i + 1 < actions.len() {
            let pause = pause_after(i + 1, cfg);
            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }
    }

    Ok(summary)
}

fn audit_or_warn(result: Result<()>) {
    if let Err(e) = result {
        warn!("Audit write failed: {e}");
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))
}

/// Ask before live orders; simulate runs and `--force` skip the prompt.
fn approved(session: &Session<'_>, force: bool, audit: &mut AuditLog) -> Result<bool> {
    if session.simulate || force {
        return Ok(true);
    }
    let ok = confirm("Execute?")?;
    audit.log("user_confirmed", serde_json::json!({ "approved": ok }))?;
    if !ok {
        println!("Aborted.");
    }
    Ok(ok)
}

fn finish(audit: &mut AuditLog, summary: &ExecutionSummary) {
    audit_or_warn(audit::log_run_completed(
        audit,
        summary.submitted,
        summary.succeeded,
        summary.failed,
        summary.simulated,
    ));
    if summary.simulated > 0 {
        println!("\n{} action(s) simulated; no orders placed.", summary.simulated);
    } else {
        println!(
            "\n{} submitted, {} accepted, {} failed.",
            summary.submitted, summary.succeeded, summary.failed
        );
    }
}

/// Full rebalance: validate the allocation, plan against the live account,
/// run preflight checks, confirm, execute, then report the result.
///
/// Returns `None` when there was nothing to do or the user declined.
pub fn run_rebalance(
    session: &Session<'_>,
    force: bool,
    audit: &mut AuditLog,
) -> Result<Option<ExecutionSummary>> {
    let (file, target) = session.load_target()?;
    audit::log_allocation_loaded(audit, &file.path, &target)?;

    let snapshot = build_snapshot(session.broker)?;
    audit::log_snapshot(audit, &snapshot)?;
    print!("{snapshot}");

    let ratios = if snapshot.account_type() == AccountType::Margin {
        fetch_margin_ratios(session.broker, &target)?
    } else {
        MarginRatios::new()
    };

    let actions = plan::plan(
        &snapshot,
        &target,
        snapshot.investable_capital_cents(),
        &ratios,
    )?;

    if actions.is_empty() {
        println!("\nNo rebalancing needed; portfolio matches target.");
        audit.log_simple("no_rebalance_needed")?;
        return Ok(None);
    }

    audit::log_plan(audit, &actions)?;
    display_plan(&actions);
    println!();

    let report = risk::check_plan(&actions, &snapshot, &target, session.config);
    print!("{report}");
    audit::log_preflight(audit, &report)?;
    if report.has_failures() {
        return Err(Error::RiskFailed(report.failure_summary()));
    }
    if report.has_warnings() {
        warn!("Preflight passed with warnings");
    }

    if !approved(session, force, audit)? {
        return Ok(None);
    }

    let exec = &session.config.execution;
    let summary = execute(session.broker, &actions, session.simulate, exec, audit)?;
    finish(audit, &summary);

    if !session.simulate {
        cooldown(exec.cooldown_secs);
        let after = build_snapshot(session.broker)?;
        print!("\n{}", reconcile::reconcile(&after, &target));
    }

    Ok(Some(summary))
}

fn cooldown(secs: u64) {
    if secs == 0 {
        return;
    }
    info!("Waiting {secs}s for orders to settle...");
    thread::sleep(Duration::from_secs(secs));
}

/// Sell every available share. Collateral shares are reported and kept.
pub fn sell_all(
    session: &Session<'_>,
    force: bool,
    audit: &mut AuditLog,
) -> Result<Option<ExecutionSummary>> {
    let snapshot = build_snapshot(session.broker)?;
    audit::log_snapshot(audit, &snapshot)?;

    for p in snapshot.positions().iter().filter(|p| p.has_collateral()) {
        warn!(
            "{} share(s) of {} held as collateral",
            p.collateral_shares, p.symbol
        );
    }

    let actions = plan::liquidate_all(&snapshot);
    if actions.is_empty() {
        println!("Nothing to sell.");
        return Ok(None);
    }

    audit::log_plan(audit, &actions)?;
    display_plan(&actions);
    println!();

    if !approved(session, force, audit)? {
        return Ok(None);
    }

    let summary = execute(
        session.broker,
        &actions,
        session.simulate,
        &session.config.execution,
        audit,
    )?;
    finish(audit, &summary);
    Ok(Some(summary))
}

/// Cancel open orders matching `filter`. Returns how many were cancelled
/// (or would be, in simulate mode).
pub fn cancel_open_orders(
    session: &Session<'_>,
    filter: OrderFilter,
    audit: &mut AuditLog,
) -> Result<usize> {
    let orders = session.broker.open_orders()?;
    let mut cancelled = 0;

    for order in orders.iter().filter(|o| filter.matches(o.side)) {
        if session.simulate {
            info!(
                "SIMULATION: Cancelling {} order of {}.",
                order.side.as_str(),
                order.symbol
            );
        } else {
            info!("Cancelling {} order of {}.", order.side.as_str(), order.symbol);
            if let Err(e) = session.broker.cancel_order(&order.id) {
                error!("Failed to cancel order {}: {e}", order.id);
                if session.config.execution.on_order_error == OrderErrorPolicy::Abort {
                    return Err(Error::Order(format!("cancel {} failed: {e}", order.id)));
                }
                continue;
            }
        }
        audit_or_warn(audit::log_order_cancelled(audit, order, session.simulate));
        cancelled += 1;
    }

    if cancelled == 0 {
        println!("No open orders to cancel.");
    } else {
        println!("{cancelled} order(s) cancelled.");
    }
    Ok(cancelled)
}

/// Print current holdings.
pub fn show_positions(session: &Session<'_>) -> Result<()> {
    let snapshot = build_snapshot(session.broker)?;
    print!("{snapshot}");
    Ok(())
}

/// Print the target allocation. Needs no login; the weight sum is checked
/// but the watchlist is not.
pub fn show_targets(config: &Config) -> Result<TargetAllocation> {
    let file = locate_allocation(config)?;
    let target = TargetAllocation::new(file.load_rows()?)?;

    println!("TARGET ALLOCATION ({}):", file.path.display());
    for (symbol, weight) in target.iter() {
        println!("  {:8} {:>8.2}%", symbol.as_str(), weight * 100.0);
    }
    println!("  {:8} {:>8.2}%", "Total", target.total_weight() * 100.0);
    Ok(target)
}

/// Print holdings against target weights.
pub fn run_reconcile(session: &Session<'_>) -> Result<reconcile::ReconcileReport> {
    let (_, target) = session.load_target()?;
    let snapshot = build_snapshot(session.broker)?;
    let report = reconcile::reconcile(&snapshot, &target);
    print!("{report}");
    Ok(report)
}

/// Write a starter allocation file from the watchlist.
pub fn generate_file(session: &Session<'_>, format: AllocationFormat) -> Result<PathBuf> {
    let watchlist = session.watchlist()?;
    let cfg = &session.config.allocation;
    let dir = session.config.allocation_dir()?;
    let name = format.file_name(&cfg.csv_file, &cfg.xlsx_file);
    let path = allocation::generate(format, &dir, name, &watchlist)?;
    println!("Wrote {}. Fill in the weights, then run `rebalancer rebalance`.", path.display());
    Ok(path)
}

fn display_plan(actions: &[TradeAction]) {
    println!("\nREBALANCE PLAN:");
    println!(
        "  {:>3}  {:4} {:8} {:>14} {:>14}  {}",
        "#", "Side", "Symbol", "Amount", "Target", "Reason"
    );
    for (i, a) in actions.iter().enumerate() {
        println!(
            "  {:>3}  {:4} {:8} {:>14} {:>14}  {}",
            i + 1,
            a.side,
            a.symbol.as_str(),
            a.amount.to_string(),
            Cents(a.target_cents),
            a.reason,
        );
    }

    let t = plan::totals(actions);
    println!(
        "\nBuys {}, sells {} + {} full exit(s)",
        Cents(t.buy_cents),
        Cents(t.sell_cents),
        t.share_sells
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_adds_batch_pause_on_boundaries() {
        let cfg = ExecutionConfig::default();
        assert_eq!(pause_after(1, &cfg), Duration::from_millis(5_000));
        assert_eq!(pause_after(9, &cfg), Duration::from_millis(5_000));
        assert_eq!(pause_after(10, &cfg), Duration::from_millis(35_000));
        assert_eq!(pause_after(20, &cfg), Duration::from_millis(35_000));
    }

    #[test]
    fn unpaced_never_sleeps() {
        let cfg = ExecutionConfig::unpaced();
        assert!(pause_after(10, &cfg).is_zero());
    }

    #[test]
    fn filter_matches_sides() {
        assert!(OrderFilter::All.matches(Side::Buy));
        assert!(OrderFilter::All.matches(Side::Sell));
        assert!(OrderFilter::Buy.matches(Side::Buy));
        assert!(!OrderFilter::Buy.matches(Side::Sell));
        assert!(OrderFilter::Sell.matches(Side::Sell));
    }
}
