//! Exclusive per-ledger lock.
//!
//! The lock is an OS advisory lock on a sibling file (`<ledger>.lock`). The
//! operating system drops it when the holder exits, so a killed run never
//! leaves a ledger locked. The file itself is left in place; only the lock on
//! it matters.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::LedgerError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Guard for an acquired ledger lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct LedgerLock {
    path: PathBuf,
    file: File,
}

impl LedgerLock {
    /// Blocks until the lock for `ledger_path` is acquired or `timeout` elapses.
    pub fn acquire(ledger_path: &Path, timeout: Duration) -> Result<Self, LedgerError> {
        let path = lock_path_for(ledger_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let started = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    record_holder(&file);
                    tracing::trace!(lock = %path.display(), "ledger lock acquired");
                    return Ok(Self { path, file });
                }
                Err(error) if is_contended(&error) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(LedgerError::Locked {
                            path: path.display().to_string(),
                            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                    thread::sleep(POLL_INTERVAL.min(timeout - waited));
                }
                Err(error) => return Err(LedgerError::Io(error)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(error) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), %error, "failed to release ledger lock");
        }
    }
}

fn is_contended(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Holder pid, for an operator inspecting the lock file.
fn record_holder(mut file: &File) {
    let written = file
        .set_len(0)
        .and_then(|()| writeln!(file, "{}", std::process::id()));
    if let Err(error) = written {
        tracing::debug!(%error, "could not record lock holder");
    }
}

pub(crate) fn lock_path_for(ledger_path: &Path) -> PathBuf {
    let mut raw: OsString = ledger_path.as_os_str().to_owned();
    raw.push(".lock");
    PathBuf::from(raw)
}
