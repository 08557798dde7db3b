use serde::Serialize;
use stwatch_core::{ExchangeId, PairFormat};

use crate::cli::Cli;
use crate::config::Config;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ExchangeListing {
    pub exchange: ExchangeId,
    pub name: &'static str,
    pub url: String,
    pub paginated: bool,
    pub rules: Vec<String>,
    pub pair_format: PairFormat,
    pub extra_columns: Vec<String>,
    pub ledger: String,
}

pub fn run(cli: &Cli, config: &Config) -> Result<Vec<ExchangeListing>, CliError> {
    let ledger_dir = config.ledger_dir(cli.ledger_dir.as_deref());

    ExchangeId::ALL
        .into_iter()
        .map(|exchange| -> Result<ExchangeListing, CliError> {
            let profile = config.profile(exchange, cli.timeout_ms)?;
            Ok(ExchangeListing {
                exchange,
                name: exchange.display_name(),
                url: profile.url.clone(),
                paginated: profile.pagination.is_some(),
                rules: profile.rules.iter().map(|rule| rule.describe()).collect(),
                pair_format: profile.pair_format,
                extra_columns: profile.detail_columns.clone(),
                ledger: profile.ledger_path(&ledger_dir).display().to_string(),
            })
        })
        .collect()
}
