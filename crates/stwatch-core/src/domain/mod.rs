//! # Domain Models
//!
//! Exchange-agnostic types shared by adapters, the classifier and the pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`InstrumentDescriptor`] | One listing entry, normalized to a fixed shape |
//! | [`FlagValue`] | Raw special flag in its wire encoding |
//! | [`PairFormat`] | How a ledger spells a trading pair |
//! | [`StatusRecord`] | A pair observed in a special status |
//! | [`UtcDateTime`] | UTC timestamp |

mod models;
mod timestamp;

pub use models::{FlagValue, InstrumentDescriptor, PairFormat, StatusRecord};
pub use timestamp::{parse_calendar_date, UtcDateTime};
