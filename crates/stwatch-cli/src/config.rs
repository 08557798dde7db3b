//! TOML configuration and logging setup.
//!
//! ```toml
//! exchanges = ["bybit", "okx"]
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//!
//! [http]
//! timeout_ms = 10000
//!
//! [ledger]
//! dir = "/var/lib/stwatch"
//! lock_timeout_ms = 10000
//!
//! [exchange.bybit]
//! page_delay_ms = 250
//! ```

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use stwatch_core::http_client::DEFAULT_TIMEOUT_MS;
use stwatch_core::{ExchangeId, ExchangeProfile, ProfileOverrides, ValidationError};
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("config section [exchange.{name}]: {source}")]
    UnknownExchange {
        name: String,
        #[source]
        source: ValidationError,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub ledger: LedgerConfig,
    /// Default selection for `scan`.
    pub exchanges: Option<Vec<String>>,
    /// Per-exchange overrides keyed by exchange name.
    pub exchange: BTreeMap<String, ProfileOverrides>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Installs the global subscriber; logs go to stderr. `RUST_LOG` wins over
    /// the configured level.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let installed = match self.format.as_str() {
            "json" => fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
        };
        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "pretty".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub dir: Option<PathBuf>,
    pub lock_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            dir: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

impl LedgerConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// An explicit path must exist; otherwise `$STWATCH_HOME/config.toml` is
    /// used when present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = resolve_stwatch_home().join("config.toml");
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Ledger directory: flag, then config, then `$STWATCH_HOME/ledger`.
    pub fn ledger_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.ledger.dir.clone())
            .unwrap_or_else(|| resolve_stwatch_home().join("ledger"))
    }

    /// Exchanges to scan: explicit names, then the configured list, then all.
    pub fn selection(&self, requested: &[String]) -> Result<Vec<ExchangeId>, ValidationError> {
        let names: Vec<&str> = if !requested.is_empty() {
            requested.iter().map(String::as_str).collect()
        } else if let Some(configured) = &self.exchanges {
            if configured.is_empty() {
                return Err(ValidationError::EmptySelection);
            }
            configured.iter().map(String::as_str).collect()
        } else {
            return Ok(ExchangeId::ALL.to_vec());
        };

        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let exchange = ExchangeId::from_str(name)?;
            if !selected.contains(&exchange) {
                selected.push(exchange);
            }
        }
        Ok(selected)
    }

    /// Built-in profile with this configuration's overrides and timeout.
    pub fn profile(
        &self,
        exchange: ExchangeId,
        timeout_ms: Option<u64>,
    ) -> Result<ExchangeProfile, ConfigError> {
        let mut profile = ExchangeProfile::builtin(exchange)
            .with_timeout_ms(timeout_ms.unwrap_or(self.http.timeout_ms));
        for (name, overrides) in &self.exchange {
            let target =
                ExchangeId::from_str(name).map_err(|source| ConfigError::UnknownExchange {
                    name: name.clone(),
                    source,
                })?;
            if target == exchange {
                profile.apply_overrides(overrides);
            }
        }
        Ok(profile)
    }
}

/// `STWATCH_HOME`, else `~/.stwatch`.
pub fn resolve_stwatch_home() -> PathBuf {
    if let Some(path) = env::var_os("STWATCH_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".stwatch");
    }

    PathBuf::from(".stwatch")
}
