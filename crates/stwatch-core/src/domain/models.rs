use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use stwatch_ledger::LedgerCandidate;
use time::Date;

use crate::UtcDateTime;

/// Raw special flag, kept in the encoding the exchange sent it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Text(String),
}

impl Display for FlagValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// One listing entry as parsed from an exchange response.
///
/// Every exchange payload is reduced to this shape; fields the exchange did not
/// send (or sent as null) stay empty rather than failing the parse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InstrumentDescriptor {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub state: Option<String>,
    pub flag: Option<FlagValue>,
    pub tags: Vec<String>,
    pub detail: BTreeMap<String, String>,
}

impl InstrumentDescriptor {
    pub fn new(
        symbol: impl Into<String>,
        base: impl Into<String>,
        quote: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            base: base.into(),
            quote: quote.into(),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_flag(mut self, flag: FlagValue) -> Self {
        self.flag = Some(flag);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_detail(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.detail.insert(column.into(), value.into());
        self
    }
}

/// How an exchange's ledger spells a trading pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairFormat {
    /// The exchange symbol as returned (`BTC-USDT`, `btcusdt`, `BTC_USDT`).
    Native,
    /// `BASE/QUOTE`.
    Slash,
}

impl PairFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Slash => "slash",
        }
    }

    /// Returns `None` when the descriptor lacks what the format needs.
    pub fn render(self, descriptor: &InstrumentDescriptor) -> Option<String> {
        let pair = match self {
            Self::Native => descriptor.symbol.trim().to_owned(),
            Self::Slash => {
                let base = descriptor.base.trim();
                let quote = descriptor.quote.trim();
                if base.is_empty() || quote.is_empty() {
                    return None;
                }
                format!("{base}/{quote}")
            }
        };

        if pair.is_empty() {
            None
        } else {
            Some(pair)
        }
    }
}

/// A pair found in a special status on one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub pair: String,
    pub base: String,
    pub quote: String,
    pub detail: BTreeMap<String, String>,
    pub observed_at: UtcDateTime,
}

impl StatusRecord {
    /// UTC day the record deduplicates on.
    pub fn observed_date(&self) -> Date {
        self.observed_at.date()
    }

    pub fn into_candidate(self) -> LedgerCandidate {
        LedgerCandidate {
            pair: self.pair,
            base: self.base,
            quote: self.quote,
            extras: self.detail,
            observed_at: self.observed_at.into_inner(),
        }
    }
}
