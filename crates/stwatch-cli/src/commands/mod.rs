mod exchanges;
mod history;
mod scan;

use std::process::ExitCode;

use stwatch_core::RunSummary;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::error::CliError;

pub use exchanges::ExchangeListing;
pub use history::HistoryReport;

/// What a command produced, rendered by [`crate::output`].
pub enum Report {
    Scan(RunSummary),
    History(HistoryReport),
    Exchanges(Vec<ExchangeListing>),
}

impl Report {
    /// Exit code 3 when every scanned exchange failed.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Scan(summary) if summary.all_failed() => ExitCode::from(3),
            _ => ExitCode::SUCCESS,
        }
    }
}

pub async fn run(cli: &Cli, config: &Config) -> Result<Report, CliError> {
    match &cli.command {
        Command::Scan(args) => scan::run(args, cli, config).await.map(Report::Scan),
        Command::History(args) => history::run(args, cli, config).map(Report::History),
        Command::Exchanges => exchanges::run(cli, config).map(Report::Exchanges),
    }
}
