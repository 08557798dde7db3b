//! CLI argument definitions for stwatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Fetch listings, classify and append new sightings to the ledgers |
//! | `history` | Print an exchange's ledger, optionally for one day |
//! | `exchanges` | List supported exchanges and how each is classified |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | `$STWATCH_HOME/config.toml` | TOML configuration file |
//! | `--ledger-dir` | `$STWATCH_HOME/ledger` | Directory holding `ST_<Exchange>.csv` files |
//! | `--format` | `table` | Output format (table, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | from config, else `10000` | Per-request timeout in ms |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Tracks exchange pairs in a special status (ST, suspended, grey, disabled).
#[derive(Debug, Parser)]
#[command(name = "stwatch", author, version, about)]
pub struct Cli {
    /// Configuration file; defaults to `$STWATCH_HOME/config.toml` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the ledger files.
    #[arg(long, global = true)]
    pub ledger_dir: Option<PathBuf>,

    /// Output format; `json` emits one machine-readable document.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text for terminals.
    Table,
    /// Single JSON document.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan exchanges and append newly seen special-status pairs.
    ///
    /// Without arguments, scans the exchanges listed in the configuration,
    /// or every supported exchange.
    ///
    ///   stwatch scan
    ///   stwatch scan bybit okx --format json
    Scan(ScanArgs),

    /// Print ledger rows for one exchange.
    ///
    ///   stwatch history kucoin
    ///   stwatch history okx --date 2024-01-02
    History(HistoryArgs),

    /// List supported exchanges.
    Exchanges,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Exchanges to scan (bitget, bybit, coinbase, gateio, huobi, kucoin, mexc, okx).
    pub exchanges: Vec<String>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub exchange: String,

    /// Only rows observed on this UTC day (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<String>,
}
