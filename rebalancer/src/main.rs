//! CLI entry point for the rhfolio rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::{error, warn};

use rhfolio_broker::robinhood::RobinhoodBroker;
use rhfolio_rebalancer::allocation::AllocationFormat;
use rhfolio_rebalancer::audit::{self, AuditLog};
use rhfolio_rebalancer::config::{self, Config};
use rhfolio_rebalancer::error::{Error, Result};
use rhfolio_rebalancer::execution::{self, OrderFilter};
use rhfolio_rebalancer::session::Session;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Portfolio rebalancer: allocation file → Robinhood")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (default: ./rebalancer.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Login credentials; falls back to ROBINHOOD_USERNAME, ROBINHOOD_PASSWORD, ROBINHOOD_TOTP
    #[arg(long, num_args = 3, value_names = ["USER", "PASS", "TOTP"], global = true)]
    credentials: Option<Vec<String>>,

    /// Log every action instead of placing or cancelling orders
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter allocation file from the watchlist
    Generate {
        #[arg(value_enum)]
        format: AllocationFormat,
    },

    /// Print the target allocation (no login)
    Targets,

    /// Print current holdings
    Positions,

    /// Compare current holdings to the target allocation
    Reconcile,

    /// Cancel open orders
    Cancel {
        #[arg(value_enum, default_value = "all")]
        filter: OrderFilter,
    },

    /// Sell every available share
    SellAll {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Plan and execute the rebalance
    Rebalance {
        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Generate { .. } => "generate",
            Command::Targets => "targets",
            Command::Positions => "positions",
            Command::Reconcile => "reconcile",
            Command::Cancel { .. } => "cancel",
            Command::SellAll { .. } => "sell-all",
            Command::Rebalance { .. } => "rebalance",
        }
    }
}

fn login(cli: &Cli, config: &Config) -> Result<RobinhoodBroker> {
    let creds = config::credentials(cli.credentials.as_deref())?;
    Ok(RobinhoodBroker::login(
        &creds,
        &config.connection.base_url,
        config.timeout(),
    )?)
}

fn run(cli: &Cli, config: &Config, audit: &mut AuditLog) -> Result<()> {
    if let Command::Targets = cli.command {
        execution::show_targets(config)?;
        return Ok(());
    }

    let broker = login(cli, config)?;
    let session = Session::new(&broker, config, cli.simulate);

    match &cli.command {
        Command::Generate { format } => {
            execution::generate_file(&session, *format)?;
        }
        Command::Targets => {}
        Command::Positions => execution::show_positions(&session)?,
        Command::Reconcile => {
            execution::run_reconcile(&session)?;
        }
        Command::Cancel { filter } => {
            execution::cancel_open_orders(&session, *filter, audit)?;
        }
        Command::SellAll { force } => {
            execution::sell_all(&session, *force, audit)?;
        }
        Command::Rebalance { force } => {
            execution::run_rebalance(&session, *force, audit)?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::resolve(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(e.exit_code());
        }
    };

    let mut audit = match config.audit_path().and_then(|p| AuditLog::open(&p)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error opening audit log: {e}");
            process::exit(1);
        }
    };
    if let Err(e) = audit::log_run_started(
        &mut audit,
        cli.command.name(),
        cli.simulate,
        &config.account.watchlist,
    ) {
        warn!("Audit write failed: {e}");
    }

    if let Err(e) = run(&cli, &config, &mut audit) {
        let code = match &e {
            Error::Aborted(_) => 0,
            other => other.exit_code(),
        };
        if let Err(audit_err) = audit::log_run_failed(&mut audit, &e.to_string(), code) {
            warn!("Audit write failed: {audit_err}");
        }

        match &e {
            Error::Aborted(msg) => eprintln!("{msg}"),
            Error::AllocationMissing { .. } => eprintln!("{e}"),
            _ => {
                error!("{e}");
                eprintln!("\nError: {e}");
            }
        }
        process::exit(code);
    }
}
