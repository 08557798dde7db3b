use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical exchange identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Bitget,
    Bybit,
    Coinbase,
    Gateio,
    Huobi,
    Kucoin,
    Mexc,
    Okx,
}

impl ExchangeId {
    pub const ALL: [Self; 8] = [
        Self::Bitget,
        Self::Bybit,
        Self::Coinbase,
        Self::Gateio,
        Self::Huobi,
        Self::Kucoin,
        Self::Mexc,
        Self::Okx,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bitget => "bitget",
            Self::Bybit => "bybit",
            Self::Coinbase => "coinbase",
            Self::Gateio => "gateio",
            Self::Huobi => "huobi",
            Self::Kucoin => "kucoin",
            Self::Mexc => "mexc",
            Self::Okx => "okx",
        }
    }

    /// Human-facing name, also used in ledger file names.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Bitget => "Bitget",
            Self::Bybit => "Bybit",
            Self::Coinbase => "Coinbase",
            Self::Gateio => "Gateio",
            Self::Huobi => "Huobi",
            Self::Kucoin => "KuCoin",
            Self::Mexc => "MEXC",
            Self::Okx => "OKX",
        }
    }

    pub fn ledger_file_name(self) -> String {
        format!("ST_{}.csv", self.display_name())
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bitget" => Ok(Self::Bitget),
            "bybit" => Ok(Self::Bybit),
            "coinbase" => Ok(Self::Coinbase),
            "gateio" | "gate" | "gate.io" => Ok(Self::Gateio),
            "huobi" | "htx" => Ok(Self::Huobi),
            "kucoin" => Ok(Self::Kucoin),
            "mexc" => Ok(Self::Mexc),
            "okx" => Ok(Self::Okx),
            other => Err(ValidationError::InvalidExchange {
                value: other.to_owned(),
            }),
        }
    }
}
