//! Source contract implemented by exchange adapters.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::{ExchangeId, InstrumentDescriptor};

/// Failure categories a fetch can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// Connection refused, timeout, TLS failure or non-2xx status.
    Transport,
    /// The response envelope reported a failure code.
    Application,
    /// Body was not JSON, or the root list was missing.
    Parse,
    Internal,
}

/// Structured error returned by adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Application,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::Application => "source.application",
            SourceErrorKind::Parse => "source.parse",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Full listing fetched from one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstrumentBatch {
    pub descriptors: Vec<InstrumentDescriptor>,
    pub pages: usize,
    /// Non-fatal conditions met while fetching (e.g. a repeated cursor).
    pub warnings: Vec<String>,
}

/// Adapter contract: produce the complete current spot listing of one exchange.
pub trait ExchangeSource: Send + Sync {
    fn id(&self) -> ExchangeId;

    fn fetch_instruments<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentBatch, SourceError>> + Send + 'a>>;
}
