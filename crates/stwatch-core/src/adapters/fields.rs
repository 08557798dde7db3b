//! Lenient extraction of descriptor fields from raw JSON listing entries.

use serde::Serialize;
use serde_json::Value;

use crate::{FlagValue, InstrumentDescriptor};

/// Ledger column fed from a payload field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailField {
    pub column: String,
    pub field: String,
}

impl DetailField {
    pub fn new(column: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            field: field.into(),
        }
    }
}

/// Where an exchange keeps each descriptor field in a listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub state: Option<String>,
    pub flag: Option<String>,
    pub tags: Option<String>,
    pub detail: Vec<DetailField>,
}

impl FieldMap {
    pub fn new(symbol: &str, base: &str, quote: &str) -> Self {
        Self {
            symbol: symbol.to_owned(),
            base: base.to_owned(),
            quote: quote.to_owned(),
            state: None,
            flag: None,
            tags: None,
            detail: Vec::new(),
        }
    }

    pub fn state(mut self, field: &str) -> Self {
        self.state = Some(field.to_owned());
        self
    }

    pub fn flag(mut self, field: &str) -> Self {
        self.flag = Some(field.to_owned());
        self
    }

    pub fn tags(mut self, field: &str) -> Self {
        self.tags = Some(field.to_owned());
        self
    }

    pub fn detail(mut self, column: &str, field: &str) -> Self {
        self.detail.push(DetailField::new(column, field));
        self
    }

    /// Reads one entry. Non-object entries yield `None`; absent, null or
    /// oddly typed fields fall back to empty values.
    pub fn descriptor(&self, item: &Value) -> Option<InstrumentDescriptor> {
        let object = item.as_object()?;
        let field = |name: &str| object.get(name).and_then(text);

        let detail = self
            .detail
            .iter()
            .filter_map(|entry| {
                object
                    .get(&entry.field)
                    .and_then(text)
                    .map(|value| (entry.column.clone(), value))
            })
            .collect();

        Some(InstrumentDescriptor {
            symbol: field(&self.symbol).unwrap_or_default(),
            base: field(&self.base).unwrap_or_default(),
            quote: field(&self.quote).unwrap_or_default(),
            state: self.state.as_deref().and_then(field),
            flag: self
                .flag
                .as_deref()
                .and_then(|name| object.get(name))
                .and_then(flag),
            tags: self
                .tags
                .as_deref()
                .and_then(|name| object.get(name))
                .map(tags)
                .unwrap_or_default(),
            detail,
        })
    }
}

/// Scalar-ish rendering of a JSON value; `None` for null.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => Some(items.iter().filter_map(text).collect::<Vec<_>>().join(",")),
        Value::Object(_) => Some(value.to_string()),
    }
}

fn flag(value: &Value) -> Option<FlagValue> {
    match value {
        Value::Bool(flag) => Some(FlagValue::Bool(*flag)),
        Value::String(text) => Some(FlagValue::Text(text.clone())),
        Value::Number(number) => Some(FlagValue::Text(number.to_string())),
        _ => None,
    }
}

/// Tags arrive as an array of strings or as one comma-separated string.
fn tags(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(text)
            .map(|tag| tag.trim().to_owned())
            .filter(|tag| !tag.is_empty())
            .collect(),
        Value::String(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Follows a dotted path of object keys.
pub fn lookup<'v>(value: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}
