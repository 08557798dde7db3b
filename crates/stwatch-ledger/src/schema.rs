//! Column layout and row types for ledger files.

use std::collections::BTreeMap;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Fixed leading columns of every ledger.
pub const LEADING_COLUMNS: [&str; 3] = ["pair", "base", "quote"];
/// Fixed trailing columns of every ledger.
pub const TRAILING_COLUMNS: [&str; 2] = ["date", "observed_at"];

/// Column layout of one exchange ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerSchema {
    extra_columns: Vec<String>,
}

impl LedgerSchema {
    pub fn new<I, S>(extra_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra_columns: extra_columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// Full header: `pair, base, quote, <extras...>, date, observed_at`.
    pub fn header(&self) -> Vec<String> {
        LEADING_COLUMNS
            .iter()
            .map(|column| (*column).to_owned())
            .chain(self.extra_columns.iter().cloned())
            .chain(TRAILING_COLUMNS.iter().map(|column| (*column).to_owned()))
            .collect()
    }

    /// Layout of a file this schema creates.
    pub fn layout(&self) -> ColumnLayout {
        let columns = self.header();
        ColumnLayout {
            pair: 0,
            date: columns.len() - TRAILING_COLUMNS.len(),
            columns,
        }
    }
}

/// Column positions of one ledger file, resolved from its header by name.
///
/// Only `pair` and `date` are required, so files written with an older or
/// narrower header (for example `pair,base,quote,date`) stay readable and
/// keep their layout when appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<String>,
    pair: usize,
    date: usize,
}

impl ColumnLayout {
    /// `None` when the header has no `pair` or no `date` column.
    pub fn from_header<I, S>(header: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns: Vec<String> = header
            .into_iter()
            .map(|column| column.as_ref().trim().to_owned())
            .collect();
        let pair = columns.iter().position(|column| column == "pair")?;
        let date = columns.iter().position(|column| column == "date")?;
        Some(Self {
            columns,
            pair,
            date,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// Dedup key of a record: its pair and calendar day.
    pub(crate) fn key(&self, record: &csv::StringRecord) -> Option<(String, Date)> {
        let pair = record.get(self.pair)?.trim();
        if pair.is_empty() {
            return None;
        }
        let date = parse_date_cell(record.get(self.date)?)?;
        Some((pair.to_owned(), date))
    }

    pub(crate) fn encode(&self, row: &LedgerRow) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| match column.as_str() {
                "pair" => row.pair.clone(),
                "base" => row.base.clone(),
                "quote" => row.quote.clone(),
                "date" => format_date(row.date),
                "observed_at" => format_instant(row.observed_at),
                extra => row.extras.get(extra).cloned().unwrap_or_default(),
            })
            .collect()
    }

    pub(crate) fn decode(&self, record: &csv::StringRecord) -> Result<LedgerRow, String> {
        let (pair, date) = self.key(record).ok_or_else(|| {
            format!(
                "missing pair or unparseable date cell '{}'",
                record.get(self.date).unwrap_or_default()
            )
        })?;

        let mut row = LedgerRow {
            pair,
            base: String::new(),
            quote: String::new(),
            extras: BTreeMap::new(),
            date,
            observed_at: date.midnight().assume_utc(),
        };
        let date_cell = record.get(self.date).unwrap_or_default().trim();
        if let Ok(instant) = OffsetDateTime::parse(date_cell, &Rfc3339) {
            row.observed_at = instant;
        }

        for (index, column) in self.columns.iter().enumerate() {
            if index == self.pair || index == self.date {
                continue;
            }
            let value = record.get(index).unwrap_or_default();
            match column.as_str() {
                "base" => row.base = value.to_owned(),
                "quote" => row.quote = value.to_owned(),
                "observed_at" => {
                    row.observed_at = OffsetDateTime::parse(value.trim(), &Rfc3339)
                        .map_err(|_| format!("unparseable observed_at cell '{value}'"))?;
                }
                _ if value.is_empty() => {}
                extra => {
                    row.extras.insert(extra.to_owned(), value.to_owned());
                }
            }
        }

        Ok(row)
    }
}

/// A row about to be merged; the ledger stamps the date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCandidate {
    pub pair: String,
    pub base: String,
    pub quote: String,
    pub extras: BTreeMap<String, String>,
    pub observed_at: OffsetDateTime,
}

impl LedgerCandidate {
    pub(crate) fn into_row(self, date: Date) -> LedgerRow {
        LedgerRow {
            pair: self.pair,
            base: self.base,
            quote: self.quote,
            extras: self.extras,
            date,
            observed_at: self.observed_at,
        }
    }
}

/// A persisted ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    pub pair: String,
    pub base: String,
    pub quote: String,
    pub extras: BTreeMap<String, String>,
    #[serde(serialize_with = "serialize_date")]
    pub date: Date,
    #[serde(serialize_with = "serialize_instant")]
    pub observed_at: OffsetDateTime,
}

/// Accepts `YYYY-MM-DD` or any cell that starts with it (e.g. a full RFC3339 stamp).
pub fn parse_date_cell(cell: &str) -> Option<Date> {
    let trimmed = cell.trim();
    let prefix = trimmed.get(..10).unwrap_or(trimmed);
    Date::parse(prefix, format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_date(date: Date) -> String {
    let format = format_description!("[year]-[month]-[day]");
    date.format(format).unwrap_or_else(|_| date.to_string())
}

fn format_instant(instant: OffsetDateTime) -> String {
    instant
        .format(&Rfc3339)
        .unwrap_or_else(|_| instant.to_string())
}

fn serialize_instant<S>(instant: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_instant(*instant))
}

fn serialize_date<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_date(*date))
}
