use serde::Serialize;
use stwatch_core::{parse_calendar_date, ExchangeId, ExchangeProfile};
use stwatch_ledger::{LedgerRow, LedgerStore};

use crate::cli::{Cli, HistoryArgs};
use crate::config::Config;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct HistoryReport {
    pub exchange: ExchangeId,
    pub ledger: String,
    pub columns: Vec<String>,
    pub date: Option<String>,
    pub rows: Vec<LedgerRow>,
}

pub fn run(args: &HistoryArgs, cli: &Cli, config: &Config) -> Result<HistoryReport, CliError> {
    let exchange = args.exchange.parse::<ExchangeId>()?;
    let day = args
        .date
        .as_deref()
        .map(parse_calendar_date)
        .transpose()?;

    let profile = ExchangeProfile::builtin(exchange);
    let store = LedgerStore::new(
        profile.ledger_path(&config.ledger_dir(cli.ledger_dir.as_deref())),
        profile.ledger_schema(),
    );

    let rows = store
        .read_rows()?
        .into_iter()
        .filter(|row| day.is_none_or(|day| row.date == day))
        .collect();

    Ok(HistoryReport {
        exchange,
        ledger: store.path().display().to_string(),
        columns: store.schema().header(),
        date: args.date.as_ref().map(|date| date.trim().to_owned()),
        rows,
    })
}
