//! Special-status classification.
//!
//! An exchange's rules are OR-combined: a descriptor is special when any rule
//! matches. Missing or null fields never match, and a flag sent in a different
//! wire form than the exchange is configured for is treated as not special.

use serde::{Deserialize, Serialize};

use crate::{FlagValue, InstrumentDescriptor, PairFormat, StatusRecord, UtcDateTime};

/// Wire encoding of an exchange's special flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FlagEncoding {
    /// JSON `true` / `false`.
    Boolean,
    /// JSON string `"true"` / `"false"`, any case.
    StringBoolean,
    /// JSON string equal to the sentinel means set.
    Sentinel(String),
}

impl FlagEncoding {
    /// `None` when the value is not in this encoding at all.
    pub fn decode(&self, value: &FlagValue) -> Option<bool> {
        match (self, value) {
            (Self::Boolean, FlagValue::Bool(set)) => Some(*set),
            (Self::StringBoolean, FlagValue::Text(text)) => {
                let text = text.trim();
                if text.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if text.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            (Self::Sentinel(sentinel), FlagValue::Text(text)) => Some(text.trim() == sentinel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StatusRule {
    StateEquals { value: String, case_insensitive: bool },
    FlagSet { encoding: FlagEncoding },
    TagContains { marker: String },
}

impl StatusRule {
    pub fn state_equals(value: impl Into<String>) -> Self {
        Self::StateEquals {
            value: value.into(),
            case_insensitive: false,
        }
    }

    pub fn state_equals_ignore_case(value: impl Into<String>) -> Self {
        Self::StateEquals {
            value: value.into(),
            case_insensitive: true,
        }
    }

    pub fn flag_set(encoding: FlagEncoding) -> Self {
        Self::FlagSet { encoding }
    }

    pub fn tag_contains(marker: impl Into<String>) -> Self {
        Self::TagContains {
            marker: marker.into(),
        }
    }

    pub fn matches(&self, descriptor: &InstrumentDescriptor) -> bool {
        match self {
            Self::StateEquals {
                value,
                case_insensitive,
            } => descriptor.state.as_deref().is_some_and(|state| {
                let state = state.trim();
                if *case_insensitive {
                    state.eq_ignore_ascii_case(value)
                } else {
                    state == value
                }
            }),
            Self::FlagSet { encoding } => {
                let Some(flag) = descriptor.flag.as_ref() else {
                    return false;
                };
                match encoding.decode(flag) {
                    Some(set) => set,
                    None => {
                        tracing::debug!(
                            symbol = %descriptor.symbol,
                            flag = %flag,
                            ?encoding,
                            "flag in unexpected encoding; treating as not special"
                        );
                        false
                    }
                }
            }
            Self::TagContains { marker } => descriptor.tags.iter().any(|tag| tag.trim() == marker),
        }
    }

    /// Short human description used by listings.
    pub fn describe(&self) -> String {
        match self {
            Self::StateEquals {
                value,
                case_insensitive: true,
            } => format!("state == '{value}' (any case)"),
            Self::StateEquals { value, .. } => format!("state == '{value}'"),
            Self::FlagSet {
                encoding: FlagEncoding::Boolean,
            } => String::from("flag == true"),
            Self::FlagSet {
                encoding: FlagEncoding::StringBoolean,
            } => String::from("flag == \"true\""),
            Self::FlagSet {
                encoding: FlagEncoding::Sentinel(sentinel),
            } => format!("flag == \"{sentinel}\""),
            Self::TagContains { marker } => format!("tags contain '{marker}'"),
        }
    }
}

/// Per-exchange classifier: rule set plus record normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<StatusRule>,
    pair_format: PairFormat,
    detail_columns: Vec<String>,
}

impl Classifier {
    pub fn new(
        rules: Vec<StatusRule>,
        pair_format: PairFormat,
        detail_columns: Vec<String>,
    ) -> Self {
        Self {
            rules,
            pair_format,
            detail_columns,
        }
    }

    pub fn is_special(&self, descriptor: &InstrumentDescriptor) -> bool {
        self.rules.iter().any(|rule| rule.matches(descriptor))
    }

    /// Returns a record for special descriptors, `None` otherwise.
    pub fn classify(
        &self,
        descriptor: &InstrumentDescriptor,
        observed_at: UtcDateTime,
    ) -> Option<StatusRecord> {
        if !self.is_special(descriptor) {
            return None;
        }

        let Some(pair) = self.pair_format.render(descriptor) else {
            tracing::debug!(
                symbol = %descriptor.symbol,
                format = self.pair_format.as_str(),
                "special descriptor has no usable pair; skipped"
            );
            return None;
        };

        let detail = self
            .detail_columns
            .iter()
            .filter_map(|column| {
                descriptor
                    .detail
                    .get(column)
                    .map(|value| (column.clone(), value.clone()))
            })
            .collect();

        Some(StatusRecord {
            pair,
            base: descriptor.base.clone(),
            quote: descriptor.quote.clone(),
            detail,
            observed_at,
        })
    }

    pub fn classify_all(
        &self,
        descriptors: &[InstrumentDescriptor],
        observed_at: UtcDateTime,
    ) -> Vec<StatusRecord> {
        descriptors
            .iter()
            .filter_map(|descriptor| self.classify(descriptor, observed_at))
            .collect()
    }
}
