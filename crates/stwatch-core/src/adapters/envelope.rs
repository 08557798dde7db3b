//! Response envelope checks: success codes and the location of the listing.

use serde::Serialize;
use serde_json::Value;

use super::fields::{lookup, text};
use crate::exchange_source::SourceError;
use crate::ExchangeId;

/// Success-code check on the envelope's root object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCheck {
    pub field: String,
    /// Accepted values, compared as text (`0` and `"0"` are equal).
    pub accepted: Vec<String>,
    /// When false, a missing status field counts as success.
    pub required: bool,
    pub message_field: String,
}

impl StatusCheck {
    pub fn required(field: &str, accepted: &[&str], message_field: &str) -> Self {
        Self {
            field: field.to_owned(),
            accepted: accepted.iter().map(|value| (*value).to_owned()).collect(),
            required: true,
            message_field: message_field.to_owned(),
        }
    }

    pub fn optional(field: &str, accepted: &[&str], message_field: &str) -> Self {
        Self {
            required: false,
            ..Self::required(field, accepted, message_field)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseShape {
    pub status: Option<StatusCheck>,
    /// Path to the listing array; empty when the body itself is the array.
    pub list_path: Vec<String>,
    /// Fields that carry an error message when a bare-array endpoint returns
    /// an object instead.
    pub error_fields: Vec<String>,
}

impl ResponseShape {
    pub fn enveloped(status: StatusCheck, list_path: &[&str]) -> Self {
        Self {
            status: Some(status),
            list_path: list_path.iter().map(|key| (*key).to_owned()).collect(),
            error_fields: Vec::new(),
        }
    }

    pub fn bare_array(error_fields: &[&str]) -> Self {
        Self {
            status: None,
            list_path: Vec::new(),
            error_fields: error_fields.iter().map(|key| (*key).to_owned()).collect(),
        }
    }

    /// Validates the envelope and returns the listing entries.
    pub fn entries<'v>(
        &self,
        exchange: ExchangeId,
        body: &'v Value,
    ) -> Result<&'v [Value], SourceError> {
        if let Some(check) = &self.status {
            match body.get(&check.field).and_then(text) {
                Some(code) if check.accepted.iter().any(|accepted| *accepted == code) => {}
                Some(code) => {
                    return Err(SourceError::application(format!(
                        "{exchange} envelope {}={code}: {}",
                        check.field,
                        message(body, &check.message_field)
                    )));
                }
                None if check.required => {
                    return Err(SourceError::application(format!(
                        "{exchange} envelope is missing '{}': {}",
                        check.field,
                        message(body, &check.message_field)
                    )));
                }
                None => {}
            }
        }

        if self.list_path.is_empty() {
            return match body {
                Value::Array(items) => Ok(items.as_slice()),
                Value::Object(_) => {
                    let reported = self
                        .error_fields
                        .iter()
                        .find_map(|field| {
                            body.get(field)
                                .and_then(text)
                                .filter(|reported| !reported.is_empty())
                        });
                    match reported {
                        Some(reported) => Err(SourceError::application(format!(
                            "{exchange} returned an error object: {reported}"
                        ))),
                        None => Err(SourceError::parse(format!(
                            "{exchange} response is not a top-level array"
                        ))),
                    }
                }
                _ => Err(SourceError::parse(format!(
                    "{exchange} response is not a top-level array"
                ))),
            };
        }

        lookup(body, &self.list_path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                SourceError::parse(format!(
                    "{exchange} response has no listing at '{}'",
                    self.list_path.join(".")
                ))
            })
    }
}

fn message(body: &Value, field: &str) -> String {
    body.get(field)
        .and_then(text)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| String::from("unknown error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange_source::SourceErrorKind;
    use serde_json::json;

    #[test]
    fn accepts_numeric_and_string_codes_alike() {
        let shape = ResponseShape::enveloped(
            StatusCheck::optional("code", &["0", "200"], "msg"),
            &["symbols"],
        );

        let numeric = json!({ "code": 200, "symbols": [{ "symbol": "A" }] });
        let absent = json!({ "symbols": [] });

        assert_eq!(
            shape.entries(ExchangeId::Mexc, &numeric).expect("ok").len(),
            1
        );
        assert!(shape.entries(ExchangeId::Mexc, &absent).expect("ok").is_empty());
    }

    #[test]
    fn failure_code_becomes_application_error() {
        let shape = ResponseShape::enveloped(
            StatusCheck::required("code", &["0"], "msg"),
            &["data"],
        );
        let body = json!({ "code": "50011", "msg": "Too Many Requests", "data": [] });

        let error = shape
            .entries(ExchangeId::Okx, &body)
            .expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::Application);
        assert_eq!(error.message(), "okx envelope code=50011: Too Many Requests");
    }

    #[test]
    fn required_status_must_be_present() {
        let shape = ResponseShape::enveloped(
            StatusCheck::required("status", &["ok"], "err-msg"),
            &["data"],
        );
        let error = shape
            .entries(ExchangeId::Huobi, &json!({ "data": [] }))
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Application);
    }

    #[test]
    fn missing_listing_is_a_parse_error() {
        let shape = ResponseShape::enveloped(
            StatusCheck::optional("retCode", &["0"], "retMsg"),
            &["result", "list"],
        );
        let error = shape
            .entries(ExchangeId::Bybit, &json!({ "retCode": 0, "result": {} }))
            .expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::Parse);
        assert!(error.message().contains("result.list"));
    }

    #[test]
    fn bare_array_endpoint_reports_error_objects() {
        let shape = ResponseShape::bare_array(&["message", "label"]);

        let error = shape
            .entries(
                ExchangeId::Gateio,
                &json!({ "label": "TOO_MANY_REQUESTS", "message": "" }),
            )
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Application);

        let error = shape
            .entries(ExchangeId::Gateio, &json!("oops"))
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Parse);
    }
}
