//! Per-exchange configuration values.
//!
//! Every exchange runs through the same pipeline; what differs between them is
//! captured here: endpoint, envelope shape, field names, status rules, pair
//! spelling and the extra ledger columns.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stwatch_ledger::LedgerSchema;

use crate::adapters::{FieldMap, ResponseShape, StatusCheck};
use crate::classifier::{Classifier, FlagEncoding, StatusRule};
use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::{ExchangeId, PairFormat};

/// Coinbase rejects requests without a browser-like user agent.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorPagination {
    /// Query parameter carrying the cursor on follow-up requests.
    pub cursor_param: String,
    /// Path to the next cursor in the response body.
    pub cursor_path: Vec<String>,
    pub page_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeProfile {
    pub exchange: ExchangeId,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Politeness delay before the first request.
    pub request_delay_ms: u64,
    pub timeout_ms: u64,
    pub pagination: Option<CursorPagination>,
    pub response: ResponseShape,
    pub fields: FieldMap,
    pub rules: Vec<StatusRule>,
    pub pair_format: PairFormat,
    pub detail_columns: Vec<String>,
}

/// Settings a user may override per exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileOverrides {
    pub base_url: Option<String>,
    pub request_delay_ms: Option<u64>,
    pub page_delay_ms: Option<u64>,
}

impl ExchangeProfile {
    /// Built-in profile for an exchange.
    pub fn builtin(exchange: ExchangeId) -> Self {
        match exchange {
            ExchangeId::Bitget => Self::new(
                exchange,
                "https://api.bitget.com/api/v2/spot/public/symbols",
                ResponseShape::enveloped(
                    StatusCheck::required("code", &["00000"], "msg"),
                    &["data"],
                ),
                FieldMap::new("symbol", "baseCoin", "quoteCoin")
                    .state("status")
                    .detail("status", "status")
                    .detail("min_trade_amount", "minTradeAmount")
                    .detail("max_trade_amount", "maxTradeAmount"),
            )
            .with_rules(vec![StatusRule::state_equals_ignore_case("gray")])
            .with_request_delay_ms(100),

            ExchangeId::Bybit => Self::new(
                exchange,
                "https://api.bybit.com/v5/market/instruments-info",
                ResponseShape::enveloped(
                    StatusCheck::optional("retCode", &["0"], "retMsg"),
                    &["result", "list"],
                ),
                FieldMap::new("symbol", "baseCoin", "quoteCoin").flag("stTag"),
            )
            .with_query("category", "spot")
            .with_pagination(CursorPagination {
                cursor_param: String::from("cursor"),
                cursor_path: vec![String::from("result"), String::from("nextPageCursor")],
                page_delay_ms: 100,
            })
            .with_rules(vec![StatusRule::flag_set(FlagEncoding::Sentinel(
                String::from("1"),
            ))])
            .with_pair_format(PairFormat::Slash),

            ExchangeId::Coinbase => Self::new(
                exchange,
                "https://api.exchange.coinbase.com/products",
                ResponseShape::bare_array(&["message"]),
                FieldMap::new("id", "base_currency", "quote_currency")
                    .state("status")
                    .detail("status", "status"),
            )
            .with_header("accept", "application/json")
            .with_header("user-agent", BROWSER_USER_AGENT)
            .with_rules(vec![StatusRule::state_equals_ignore_case("disabled")]),

            ExchangeId::Gateio => Self::new(
                exchange,
                "https://api.gateio.ws/api/v4/spot/currency_pairs",
                ResponseShape::bare_array(&["message", "label"]),
                FieldMap::new("id", "base", "quote")
                    .flag("st_tag")
                    .detail("st_tag", "st_tag"),
            )
            .with_rules(vec![StatusRule::flag_set(FlagEncoding::Boolean)]),

            ExchangeId::Huobi => Self::new(
                exchange,
                "https://api.huobi.pro/v1/settings/common/symbols",
                ResponseShape::enveloped(
                    StatusCheck::required("status", &["ok"], "err-msg"),
                    &["data"],
                ),
                FieldMap::new("symbol", "bc", "qc")
                    .state("state")
                    .tags("tags")
                    .detail("state", "state")
                    .detail("tags", "tags"),
            )
            .with_rules(vec![
                StatusRule::state_equals("suspend"),
                StatusRule::tag_contains("st"),
            ])
            .with_request_delay_ms(100),

            ExchangeId::Kucoin => Self::new(
                exchange,
                "https://api.kucoin.com/api/v2/symbols",
                ResponseShape::enveloped(
                    StatusCheck::optional("code", &["200000"], "msg"),
                    &["data"],
                ),
                FieldMap::new("symbol", "baseCurrency", "quoteCurrency")
                    .flag("st")
                    .detail("st", "st")
                    .detail("enable_trading", "enableTrading"),
            )
            .with_rules(vec![StatusRule::flag_set(FlagEncoding::StringBoolean)])
            .with_request_delay_ms(200),

            ExchangeId::Mexc => Self::new(
                exchange,
                "https://api.mexc.com/api/v3/exchangeInfo",
                ResponseShape::enveloped(
                    StatusCheck::optional("code", &["0", "200"], "msg"),
                    &["symbols"],
                ),
                FieldMap::new("symbol", "baseAsset", "quoteAsset").flag("st"),
            )
            .with_rules(vec![StatusRule::flag_set(FlagEncoding::Boolean)])
            .with_pair_format(PairFormat::Slash)
            .with_request_delay_ms(200),

            ExchangeId::Okx => Self::new(
                exchange,
                "https://www.okx.com/api/v5/public/instruments",
                ResponseShape::enveloped(StatusCheck::required("code", &["0"], "msg"), &["data"]),
                FieldMap::new("instId", "baseCcy", "quoteCcy")
                    .state("state")
                    .detail("state", "state")
                    .detail("min_order_size", "minSz")
                    .detail("tick_size", "tickSz"),
            )
            .with_query("instType", "SPOT")
            .with_rules(vec![StatusRule::state_equals("suspend")])
            .with_request_delay_ms(100),
        }
    }

    /// Built-in profiles for every supported exchange.
    pub fn all() -> Vec<Self> {
        ExchangeId::ALL.into_iter().map(Self::builtin).collect()
    }

    /// Bare profile: native pairs, no rules, no delays. Detail columns follow
    /// the field map.
    pub fn new(
        exchange: ExchangeId,
        url: impl Into<String>,
        response: ResponseShape,
        fields: FieldMap,
    ) -> Self {
        let detail_columns = fields
            .detail
            .iter()
            .map(|entry| entry.column.clone())
            .collect();
        Self {
            exchange,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            request_delay_ms: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            pagination: None,
            response,
            fields,
            rules: Vec::new(),
            pair_format: PairFormat::Native,
            detail_columns,
        }
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_pagination(mut self, pagination: CursorPagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_rules(mut self, rules: Vec<StatusRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_pair_format(mut self, pair_format: PairFormat) -> Self {
        self.pair_format = pair_format;
        self
    }

    pub fn with_request_delay_ms(mut self, request_delay_ms: u64) -> Self {
        self.request_delay_ms = request_delay_ms;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Drops every politeness delay; handy for tests and local mirrors.
    pub fn without_delays(mut self) -> Self {
        self.request_delay_ms = 0;
        if let Some(pagination) = self.pagination.as_mut() {
            pagination.page_delay_ms = 0;
        }
        self
    }

    pub fn apply_overrides(&mut self, overrides: &ProfileOverrides) {
        if let Some(url) = &overrides.base_url {
            self.url = url.clone();
        }
        if let Some(delay) = overrides.request_delay_ms {
            self.request_delay_ms = delay;
        }
        if let (Some(delay), Some(pagination)) =
            (overrides.page_delay_ms, self.pagination.as_mut())
        {
            pagination.page_delay_ms = delay;
        }
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            self.rules.clone(),
            self.pair_format,
            self.detail_columns.clone(),
        )
    }

    pub fn ledger_schema(&self) -> LedgerSchema {
        LedgerSchema::new(self.detail_columns.iter().cloned())
    }

    pub fn ledger_path(&self, ledger_dir: &Path) -> PathBuf {
        ledger_dir.join(self.exchange.ledger_file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_exchange_has_a_profile_with_rules() {
        let profiles = ExchangeProfile::all();
        assert_eq!(profiles.len(), ExchangeId::ALL.len());
        for profile in &profiles {
            assert!(!profile.rules.is_empty(), "{} has no rules", profile.exchange);
            assert!(profile.url.starts_with("https://"));
        }
    }

    #[test]
    fn mapped_status_fields_are_each_read_by_a_rule() {
        for profile in ExchangeProfile::all() {
            let reads = |wanted: fn(&StatusRule) -> bool| profile.rules.iter().any(wanted);
            assert_eq!(
                profile.fields.state.is_some(),
                reads(|rule| matches!(rule, StatusRule::StateEquals { .. })),
                "{} state mapping",
                profile.exchange
            );
            assert_eq!(
                profile.fields.flag.is_some(),
                reads(|rule| matches!(rule, StatusRule::FlagSet { .. })),
                "{} flag mapping",
                profile.exchange
            );
            assert_eq!(
                profile.fields.tags.is_some(),
                reads(|rule| matches!(rule, StatusRule::TagContains { .. })),
                "{} tags mapping",
                profile.exchange
            );
        }
    }

    #[test]
    fn only_bybit_paginates() {
        let paginated: Vec<_> = ExchangeProfile::all()
            .into_iter()
            .filter(|profile| profile.pagination.is_some())
            .map(|profile| profile.exchange)
            .collect();
        assert_eq!(paginated, vec![ExchangeId::Bybit]);
    }

    #[test]
    fn ledger_columns_follow_detail_fields() {
        let okx = ExchangeProfile::builtin(ExchangeId::Okx);
        assert_eq!(
            okx.ledger_schema().header(),
            vec![
                "pair",
                "base",
                "quote",
                "state",
                "min_order_size",
                "tick_size",
                "date",
                "observed_at"
            ]
        );
        assert!(ExchangeProfile::builtin(ExchangeId::Bybit)
            .detail_columns
            .is_empty());
    }

    #[test]
    fn overrides_replace_url_and_delays() {
        let mut bybit = ExchangeProfile::builtin(ExchangeId::Bybit);
        bybit.apply_overrides(&ProfileOverrides {
            base_url: Some(String::from("http://127.0.0.1:9000/instruments")),
            request_delay_ms: Some(5),
            page_delay_ms: Some(0),
        });

        assert_eq!(bybit.url, "http://127.0.0.1:9000/instruments");
        assert_eq!(bybit.request_delay_ms, 5);
        assert_eq!(
            bybit.pagination.as_ref().map(|pagination| pagination.page_delay_ms),
            Some(0)
        );
    }

    #[test]
    fn ledger_path_uses_exchange_file_name() {
        let profile = ExchangeProfile::builtin(ExchangeId::Gateio);
        assert_eq!(
            profile.ledger_path(Path::new("/var/lib/stwatch")),
            PathBuf::from("/var/lib/stwatch/ST_Gateio.csv")
        );
    }
}
