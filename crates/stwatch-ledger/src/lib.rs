//! # stwatch Ledger
//!
//! Append-only, per-exchange CSV ledger of special-status observations.
//!
//! ## Overview
//!
//! Each exchange owns one flat CSV file. A file is created with its header on
//! first use and only ever grows: rows are appended, never rewritten. The
//! ledger enforces a single invariant:
//!
//! - no two rows share the same `(pair, date)`.
//!
//! Columns are located by header name. Only `pair` and `date` are required,
//! so files with an older, narrower header are read and appended to in their
//! own layout. Rows that cannot be decoded are skipped with a warning.
//!
//! ## Layout
//!
//! | Column | Description |
//! |--------|-------------|
//! | `pair` | Exchange pair identifier (convention fixed per exchange) |
//! | `base` / `quote` | Asset codes |
//! | extra columns | Exchange-specific status detail |
//! | `date` | Calendar day of the observation (`YYYY-MM-DD`) |
//! | `observed_at` | RFC3339 instant of the observation |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stwatch_ledger::{LedgerCandidate, LedgerSchema, LedgerStore};
//! use time::OffsetDateTime;
//!
//! fn main() -> Result<(), stwatch_ledger::LedgerError> {
//!     let store = LedgerStore::new("ST_OKX.csv", LedgerSchema::new(["state"]));
//!     let now = OffsetDateTime::now_utc();
//!     let report = store.merge(
//!         vec![LedgerCandidate {
//!             pair: "BTC-USDT".into(),
//!             base: "BTC".into(),
//!             quote: "USDT".into(),
//!             extras: Default::default(),
//!             observed_at: now,
//!         }],
//!         now.date(),
//!     )?;
//!     println!("appended {}", report.appended_count());
//!     Ok(())
//! }
//! ```

pub mod lock;
pub mod schema;

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use time::Date;

pub use lock::LedgerLock;
pub use schema::{
    format_date, parse_date_cell, ColumnLayout, LedgerCandidate, LedgerRow, LedgerSchema,
};

/// Errors that can occur while reading or appending a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// File system error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Existing file has no `pair` or no `date` column.
    #[error("ledger {path} has header [{found}], which lacks a pair or date column")]
    SchemaMismatch { path: String, found: String },

    /// Another writer holds the ledger lock.
    #[error("ledger lock {path} is held by another writer (waited {waited_ms}ms)")]
    Locked { path: String, waited_ms: u64 },
}

/// Outcome of a single merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Pairs appended, in input order.
    pub appended: Vec<String>,
    /// Pairs skipped because they were already logged for the day.
    pub skipped: Vec<String>,
}

impl MergeReport {
    pub fn appended_count(&self) -> usize {
        self.appended.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// One exchange ledger backed by a CSV file.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
    schema: LedgerSchema,
    lock_timeout: Duration,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>, schema: LedgerSchema) -> Self {
        Self {
            path: path.into(),
            schema,
            lock_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &LedgerSchema {
        &self.schema
    }

    /// Reads every persisted row. A missing file reads as empty.
    ///
    /// Rows that cannot be decoded (for example a line cut short by a crash)
    /// are skipped with a warning.
    pub fn read_rows(&self) -> Result<Vec<LedgerRow>, LedgerError> {
        let mut rows = Vec::new();
        self.scan(|layout, record| match layout.decode(record) {
            Ok(row) => rows.push(row),
            Err(reason) => self.warn_skipped(record, &reason),
        })?;
        Ok(rows)
    }

    /// Pairs already logged on `date`. Only the `pair` and `date` cells are
    /// consulted; unreadable rows are skipped with a warning.
    pub fn pairs_on(&self, date: Date) -> Result<HashSet<String>, LedgerError> {
        let mut pairs = HashSet::new();
        self.scan(|layout, record| match layout.key(record) {
            Some((pair, logged)) if logged == date => {
                pairs.insert(pair);
            }
            Some(_) => {}
            None => self.warn_skipped(record, "missing pair or unparseable date"),
        })?;
        Ok(pairs)
    }

    /// Appends every candidate whose pair has not been logged on `today`.
    ///
    /// The read-check-append sequence runs under the ledger lock. Candidates
    /// are considered in input order; a pair repeated within the batch is
    /// appended once.
    pub fn merge(
        &self,
        candidates: Vec<LedgerCandidate>,
        today: Date,
    ) -> Result<MergeReport, LedgerError> {
        let _lock = LedgerLock::acquire(&self.path, self.lock_timeout)?;

        let mut seen = self.pairs_on(today)?;
        let mut report = MergeReport::default();
        let mut pending = Vec::new();

        for candidate in candidates {
            if seen.contains(&candidate.pair) {
                tracing::debug!(pair = %candidate.pair, "already logged today, skipping");
                report.skipped.push(candidate.pair);
                continue;
            }
            seen.insert(candidate.pair.clone());
            report.appended.push(candidate.pair.clone());
            pending.push(candidate.into_row(today));
        }

        self.append_rows(&pending)?;
        tracing::debug!(
            ledger = %self.path.display(),
            appended = report.appended_count(),
            skipped = report.skipped_count(),
            "ledger merge complete"
        );
        Ok(report)
    }

    /// Creates the file with its header when absent or empty.
    pub fn ensure_initialized(&self) -> Result<(), LedgerError> {
        self.append_rows(&[])
    }

    /// Layout of the file on disk, `None` when it is absent or empty.
    pub fn file_layout(&self) -> Result<Option<ColumnLayout>, LedgerError> {
        if !self.has_content()? {
            return Ok(None);
        }
        let mut reader = self.reader()?;
        self.layout_of(reader.headers()?).map(Some)
    }

    fn scan<F>(&self, mut visit: F) -> Result<(), LedgerError>
    where
        F: FnMut(&ColumnLayout, &csv::StringRecord),
    {
        if !self.has_content()? {
            return Ok(());
        }

        let mut reader = self.reader()?;
        let layout = self.layout_of(reader.headers()?)?;
        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(error) if error.is_io_error() => return Err(error.into()),
                Err(error) => {
                    tracing::warn!(
                        ledger = %self.path.display(),
                        %error,
                        "skipping unreadable ledger row"
                    );
                    continue;
                }
            };
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            visit(&layout, &record);
        }
        Ok(())
    }

    fn reader(&self) -> Result<csv::Reader<File>, LedgerError> {
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?)
    }

    fn layout_of(&self, header: &csv::StringRecord) -> Result<ColumnLayout, LedgerError> {
        ColumnLayout::from_header(header.iter()).ok_or_else(|| LedgerError::SchemaMismatch {
            path: self.path.display().to_string(),
            found: header.iter().collect::<Vec<_>>().join(","),
        })
    }

    fn warn_skipped(&self, record: &csv::StringRecord, reason: &str) {
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        tracing::warn!(
            ledger = %self.path.display(),
            line,
            reason,
            "skipping unreadable ledger row"
        );
    }

    fn append_rows(&self, rows: &[LedgerRow]) -> Result<(), LedgerError> {
        let existing = self.file_layout()?;
        let needs_header = existing.is_none();
        if !needs_header && rows.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        let layout = match existing {
            Some(layout) => {
                if !ends_with_newline(&mut file)? {
                    tracing::warn!(
                        ledger = %self.path.display(),
                        "ledger did not end with a newline; terminating the last line"
                    );
                    file.write_all(b"\n")?;
                }
                for column in self.schema.extra_columns() {
                    if !layout.has_column(column) {
                        tracing::debug!(
                            ledger = %self.path.display(),
                            %column,
                            "column not in existing header, not recorded"
                        );
                    }
                }
                layout
            }
            None => self.schema.layout(),
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(layout.columns())?;
        }
        for row in rows {
            writer.write_record(layout.encode(row))?;
        }

        let file: File = writer.into_inner().map_err(|error| error.into_error())?;
        file.sync_data()?;
        Ok(())
    }

    fn has_content(&self) -> Result<bool, LedgerError> {
        match fs::metadata(&self.path) {
            Ok(metadata) => Ok(metadata.len() > 0),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(LedgerError::Io(error)),
        }
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool, LedgerError> {
    let length = file.metadata()?.len();
    if length == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(length - 1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
