//! CLI argument definitions for regtrack.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Collect, validate and enrich new leads, then export them |
//! | `init` | Create the lead and run-log tables |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | `./regtrack.toml` if present | Configuration file |
//! | `--db-path` | `$REGTRACK_HOME/leads.duckdb` | Lead database |
//! | `--log-json` | `false` | Emit logs as JSON lines |
//!
//! # Examples
//!
//! ```bash
//! # Daily run from cron
//! REGTRACK__REGISTRY__API_KEY=... regtrack run
//!
//! # Wider window with the strike-off check enabled
//! regtrack --config /etc/regtrack.toml run --max-age-days 90 --check-detailed-status
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tracks newly incorporated companies in the company registry.
#[derive(Debug, Parser)]
#[command(name = "regtrack", author, version, about)]
pub struct Cli {
    /// Configuration file (TOML). Environment variables `REGTRACK__<SECTION>__<KEY>`
    /// override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path of the lead database.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the lead pipeline once.
    Run(RunArgs),
    /// Create missing tables and report their state.
    Init,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Look this many days back for incorporations.
    #[arg(long)]
    pub max_age_days: Option<u32>,

    /// Fetch every profile and drop companies with an excluded status detail.
    #[arg(long, default_value_t = false)]
    pub check_detailed_status: bool,
}
