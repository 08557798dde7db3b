use thiserror::Error;

/// Validation and contract errors exposed by `stwatch-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "invalid exchange '{value}', expected one of bitget, bybit, coinbase, gateio, huobi, kucoin, mexc, okx"
    )]
    InvalidExchange { value: String },

    #[error("date must be formatted YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("exchange selection must not be empty")]
    EmptySelection,
}
