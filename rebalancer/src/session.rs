//! Per-run context shared by the workflows.

use log::info;
use rhfolio::{Symbol, TargetAllocation};
use rhfolio_broker::Brokerage;

use crate::allocation::AllocationFile;
use crate::config::Config;
use crate::error::Result;

/// Authenticated broker handle, configuration and run mode.
pub struct Session<'a> {
    pub broker: &'a dyn Brokerage,
    pub config: &'a Config,
    /// Log actions instead of placing or cancelling orders.
    pub simulate: bool,
}

impl<'a> Session<'a> {
    pub fn new(broker: &'a dyn Brokerage, config: &'a Config, simulate: bool) -> Self {
        if simulate {
            info!("Simulation mode: no orders will be placed or cancelled");
        }
        Self {
            broker,
            config,
            simulate,
        }
    }

    /// Symbols of the configured watchlist.
    pub fn watchlist(&self) -> Result<Vec<Symbol>> {
        let name = &self.config.account.watchlist;
        let symbols = self.broker.watchlist(name)?;
        info!("Watchlist {name:?}: {} symbols", symbols.len());
        Ok(symbols)
    }

    /// Locate the configured allocation file.
    pub fn allocation_file(&self) -> Result<AllocationFile> {
        locate_allocation(self.config)
    }

    /// Load the allocation file and validate it against the watchlist.
    pub fn load_target(&self) -> Result<(AllocationFile, TargetAllocation)> {
        let watchlist = self.watchlist()?;
        let file = self.allocation_file()?;
        let target = file.load(&watchlist)?;
        Ok((file, target))
    }
}

/// Locate the allocation file named in `config`.
pub fn locate_allocation(config: &Config) -> Result<AllocationFile> {
    let dir = config.allocation_dir()?;
    AllocationFile::locate(
        &dir,
        &config.allocation.csv_file,
        &config.allocation.xlsx_file,
    )
}
