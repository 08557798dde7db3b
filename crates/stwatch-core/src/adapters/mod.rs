//! # Exchange Adapters
//!
//! All supported exchanges publish their spot listing as JSON over a public
//! GET endpoint. One [`RestExchangeSource`] serves them all; the differences
//! live in the exchange's [`ExchangeProfile`](crate::profile::ExchangeProfile):
//!
//! | Piece | Role |
//! |-------|------|
//! | [`ResponseShape`] | envelope success check and location of the listing |
//! | [`FieldMap`] | payload field names feeding each descriptor field |
//! | [`CursorPagination`](crate::profile::CursorPagination) | cursor parameter and location of the next cursor |
//!
//! Field extraction is lenient: missing, null or oddly typed fields become
//! empty values. Only an unparseable body, a failed envelope check or a missing
//! listing fails the fetch.

mod envelope;
mod fields;
mod rest;

pub use envelope::{ResponseShape, StatusCheck};
pub use fields::{DetailField, FieldMap};
pub use rest::RestExchangeSource;
