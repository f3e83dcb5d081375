//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to the audit file, one JSON object
//! per line: `event`, `ts`, and event-specific fields.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use rhfolio::plan::totals;
use rhfolio::{PortfolioSnapshot, TargetAllocation, TradeAction};
use rhfolio_broker::{OpenOrder, OrderTicket};
use serde::Serialize;

use crate::error::Result;
use crate::risk::RiskReport;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

fn dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn action_json(action: &TradeAction) -> serde_json::Value {
    serde_json::to_value(action).unwrap_or_else(|_| serde_json::json!(action.to_string()))
}

pub fn log_run_started(
    audit: &mut AuditLog,
    command: &str,
    simulate: bool,
    watchlist: &str,
) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "command": command,
            "simulate": simulate,
            "watchlist": watchlist,
        }),
    )
}

pub fn log_allocation_loaded(
    audit: &mut AuditLog,
    path: &Path,
    target: &TargetAllocation,
) -> Result<()> {
    let weights: Vec<_> = target
        .iter()
        .map(|(sym, w)| serde_json::json!({ "symbol": sym.as_str(), "weight": w }))
        .collect();
    audit.log(
        "allocation_loaded",
        serde_json::json!({
            "file": path.display().to_string(),
            "targets": weights,
        }),
    )
}

pub fn log_snapshot(audit: &mut AuditLog, snapshot: &PortfolioSnapshot) -> Result<()> {
    let positions: Vec<_> = snapshot
        .positions()
        .iter()
        .map(|p| {
            serde_json::json!({
                "symbol": p.symbol.as_str(),
                "equity": dollars(p.equity_cents),
                "available": p.available_shares,
                "collateral": p.collateral_shares,
            })
        })
        .collect();
    audit.log(
        "snapshot_fetched",
        serde_json::json!({
            "account_type": snapshot.account_type().to_string(),
            "buying_power": dollars(snapshot.buying_power_cents()),
            "market_value": dollars(snapshot.market_value_cents()),
            "positions": positions,
        }),
    )
}

pub fn log_plan(audit: &mut AuditLog, actions: &[TradeAction]) -> Result<()> {
    let t = totals(actions);
    let data: Vec<_> = actions.iter().map(action_json).collect();
    audit.log(
        "plan_computed",
        serde_json::json!({
            "actions": data,
            "buy": dollars(t.buy_cents),
            "sell": dollars(t.sell_cents),
            "share_sells": t.share_sells,
        }),
    )
}

pub fn log_preflight(audit: &mut AuditLog, report: &RiskReport) -> Result<()> {
    let check_data: Vec<_> = report
        .checks
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "status": c.status.to_string(),
                "detail": c.detail,
            })
        })
        .collect();

    audit.log(
        "preflight",
        serde_json::json!({
            "passed": !report.has_failures(),
            "checks": check_data,
        }),
    )
}

pub fn log_order_submitted(
    audit: &mut AuditLog,
    action: &TradeAction,
    ticket: &OrderTicket,
) -> Result<()> {
    audit.log(
        "order_submitted",
        serde_json::json!({
            "action": action_json(action),
            "order_id": ticket.id.0,
            "state": ticket.state,
        }),
    )
}

pub fn log_order_failed(audit: &mut AuditLog, action: &TradeAction, error: &str) -> Result<()> {
    audit.log(
        "order_failed",
        serde_json::json!({
            "action": action_json(action),
            "error": error,
        }),
    )
}

pub fn log_order_simulated(audit: &mut AuditLog, action: &TradeAction) -> Result<()> {
    audit.log(
        "order_simulated",
        serde_json::json!({ "action": action_json(action) }),
    )
}

pub fn log_order_cancelled(audit: &mut AuditLog, order: &OpenOrder, simulate: bool) -> Result<()> {
    audit.log(
        "order_cancelled",
        serde_json::json!({
            "order_id": order.id.0,
            "symbol": order.symbol.as_str(),
            "side": order.side.as_str(),
            "quantity": order.quantity,
            "simulate": simulate,
        }),
    )
}

pub fn log_run_completed(
    audit: &mut AuditLog,
    submitted: usize,
    succeeded: usize,
    failed: usize,
    simulated: usize,
) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "submitted": submitted,
            "succeeded": succeeded,
            "failed": failed,
            "simulated": simulated,
        }),
    )
}

pub fn log_run_failed(audit: &mut AuditLog, error: &str, exit_code: i32) -> Result<()> {
    audit.log(
        "run_failed",
        serde_json::json!({
            "error": error,
            "exit_code": exit_code,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhfolio::plan::{Amount, Reason};
    use rhfolio::{Side, Symbol};

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("test_event").unwrap();
            log.log("test_data", serde_json::json!({"key": "value"}))
                .unwrap();
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "test_event");
        assert!(lines[0]["ts"].is_string());
        assert_eq!(lines[1]["key"], "value");
    }

    #[test]
    fn audit_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        AuditLog::open(&path).unwrap().log_simple("first").unwrap();
        AuditLog::open(&path).unwrap().log_simple("second").unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["event"], "second");
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log_simple("test").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn plan_event_carries_actions_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let actions = vec![
            TradeAction {
                symbol: Symbol::new("BBB"),
                side: Side::Sell,
                amount: Amount::Shares(3.0),
                target_cents: 0,
                reason: Reason::Divest,
            },
            TradeAction {
                symbol: Symbol::new("AAA"),
                side: Side::Buy,
                amount: Amount::Dollars(300_00),
                target_cents: 800_00,
                reason: Reason::Increase,
            },
        ];

        let mut log = AuditLog::open(&path).unwrap();
        log_plan(&mut log, &actions).unwrap();
        log_run_failed(&mut log, "boom", 1).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[0]["event"], "plan_computed");
        assert_eq!(lines[0]["actions"].as_array().unwrap().len(), 2);
        assert_eq!(lines[0]["buy"], 300.0);
        assert_eq!(lines[0]["share_sells"], 1);
        assert_eq!(lines[1]["event"], "run_failed");
        assert_eq!(lines[1]["exit_code"], 1);
    }
}
