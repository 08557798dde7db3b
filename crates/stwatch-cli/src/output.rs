use std::io::{self, Write};

use serde::Serialize;
use stwatch_core::RunSummary;
use stwatch_ledger::format_date;

use crate::cli::OutputFormat;
use crate::commands::{ExchangeListing, HistoryReport, Report};
use crate::error::CliError;

pub fn render(report: &Report, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => match report {
            Report::Scan(summary) => write_json(&mut out, summary, pretty)?,
            Report::History(history) => write_json(&mut out, history, pretty)?,
            Report::Exchanges(listings) => write_json(&mut out, listings, pretty)?,
        },
        OutputFormat::Table => match report {
            Report::Scan(summary) => write_scan_table(&mut out, summary)?,
            Report::History(history) => write_history_table(&mut out, history)?,
            Report::Exchanges(listings) => write_exchanges_table(&mut out, listings)?,
        },
    }
    out.flush()?;
    Ok(())
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(out, "{payload}")?;
    Ok(())
}

fn write_scan_table<W: Write>(out: &mut W, summary: &RunSummary) -> Result<(), CliError> {
    writeln!(out, "run_id    : {}", summary.run_id)?;
    writeln!(out, "started_at: {}", summary.started_at)?;
    writeln!(out, "latency_ms: {}", summary.latency_ms)?;
    writeln!(out)?;

    let rows = summary
        .outcomes
        .iter()
        .map(|outcome| {
            vec![
                outcome.exchange.to_string(),
                outcome.fetched.to_string(),
                outcome.classified.to_string(),
                outcome.records_added.to_string(),
                outcome.records_skipped.to_string(),
                match &outcome.failure {
                    Some(failure) => format!("failed ({})", failure.code()),
                    None => String::from("ok"),
                },
            ]
        })
        .collect::<Vec<_>>();
    write_grid(
        out,
        &["exchange", "fetched", "special", "added", "skipped", "status"],
        &rows,
    )?;

    for outcome in &summary.outcomes {
        for pair in &outcome.added_pairs {
            writeln!(out, "+ {}: {pair}", outcome.exchange)?;
        }
        for warning in &outcome.warnings {
            writeln!(out, "! {}: {warning}", outcome.exchange)?;
        }
        if let Some(failure) = &outcome.failure {
            writeln!(out, "x {failure}")?;
        }
    }

    writeln!(
        out,
        "\n{} succeeded, {} failed, {} added, {} already logged today",
        summary.succeeded_count(),
        summary.failed_count(),
        summary.records_added(),
        summary.records_skipped()
    )?;
    Ok(())
}

fn write_history_table<W: Write>(out: &mut W, history: &HistoryReport) -> Result<(), CliError> {
    writeln!(out, "ledger: {}", history.ledger)?;
    if let Some(date) = &history.date {
        writeln!(out, "date  : {date}")?;
    }
    writeln!(out)?;

    let extras = &history.columns[3..history.columns.len().saturating_sub(2)];
    let rows = history
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.pair.clone(), row.base.clone(), row.quote.clone()];
            cells.extend(
                extras
                    .iter()
                    .map(|column| row.extras.get(column).cloned().unwrap_or_default()),
            );
            cells.push(format_date(row.date));
            cells
        })
        .collect::<Vec<_>>();

    let mut header = vec!["pair", "base", "quote"];
    header.extend(extras.iter().map(String::as_str));
    header.push("date");
    write_grid(out, &header, &rows)?;
    writeln!(out, "\n{} row(s)", history.rows.len())?;
    Ok(())
}

fn write_exchanges_table<W: Write>(
    out: &mut W,
    listings: &[ExchangeListing],
) -> Result<(), CliError> {
    let rows = listings
        .iter()
        .map(|listing| {
            vec![
                listing.exchange.to_string(),
                listing.rules.join(" OR "),
                listing.pair_format.as_str().to_owned(),
                if listing.paginated { "yes" } else { "no" }.to_owned(),
                listing.ledger.clone(),
            ]
        })
        .collect::<Vec<_>>();
    write_grid(
        out,
        &["exchange", "special when", "pair", "paged", "ledger"],
        &rows,
    )
}

/// Left-aligned columns separated by two spaces.
fn write_grid<W: Write>(out: &mut W, header: &[&str], rows: &[Vec<String>]) -> Result<(), CliError> {
    let mut widths = header.iter().map(|cell| cell.len()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}", width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };

    writeln!(out, "{}", line(header.to_vec()))?;
    for row in rows {
        writeln!(out, "{}", line(row.iter().map(String::as_str).collect()))?;
    }
    Ok(())
}
