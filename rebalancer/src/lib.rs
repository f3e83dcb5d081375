// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! rhfolio-rebalancer: target-weight rebalancer for Robinhood accounts.
//!
//! Reads target weights from a spreadsheet or CSV allocation file, checks
//! them against a Robinhood watchlist, plans the trades against the live
//! account, and places dollar- and share-based orders with preflight checks
//! and a JSONL audit trail.

pub mod allocation;
pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod reconcile;
pub mod risk;
pub mod session;
pub mod snapshot;
