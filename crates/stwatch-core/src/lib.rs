//! # stwatch Core
//!
//! Tracks exchange listings in a "special status" (ST tag, suspended, grey
//! market, disabled) and records each sighting once per pair per day.
//!
//! ## Overview
//!
//! - **Exchange profiles** describing each supported exchange as data
//! - **REST adapter** fetching the complete spot listing, following cursors
//! - **Classifier** applying an exchange's OR-combined status rules
//! - **Pipeline** running fetch, classify and ledger merge for one exchange
//! - **Orchestrator** running several pipelines concurrently
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Profile-driven REST adapter, envelope and field extraction |
//! | [`classifier`] | Status rules, flag encodings, record normalization |
//! | [`domain`] | Descriptors, status records, timestamps |
//! | [`error`] | Core error types |
//! | [`exchange`] | Exchange identifiers |
//! | [`exchange_source`] | Adapter trait and source errors |
//! | [`http_client`] | HTTP client abstraction |
//! | [`orchestrator`] | Concurrent runs and run summaries |
//! | [`pagination`] | Cursor pagination driver |
//! | [`pipeline`] | Per-exchange run |
//! | [`profile`] | Per-exchange configuration |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stwatch_core::{ExchangeId, ExchangeProfile, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let summary = Orchestrator::builder()
//!         .with_profile(ExchangeProfile::builtin(ExchangeId::Bybit))
//!         .with_ledger_dir("ledger")
//!         .build()
//!         .run()
//!         .await;
//!
//!     for outcome in &summary.outcomes {
//!         println!("{}: {} added", outcome.exchange, outcome.records_added);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Orchestrator   │  one task per exchange
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ ExchangePipeline│────▶│ RestExchangeSource│──▶ HttpClient
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Classifier    │────▶│   LedgerStore    │  (blocking pool)
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! A failed exchange never affects the others; its outcome carries a
//! [`PipelineError`] naming the exchange:
//!
//! ```rust
//! use stwatch_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::Transport => "exchange unreachable",
//!         SourceErrorKind::Application => "exchange reported an error",
//!         SourceErrorKind::Parse => "unexpected response shape",
//!         SourceErrorKind::Internal => "internal error",
//!     }
//! }
//! ```

pub mod adapters;
pub mod classifier;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod exchange_source;
pub mod http_client;
pub mod orchestrator;
pub mod pagination;
pub mod pipeline;
pub mod profile;

pub use adapters::{FieldMap, ResponseShape, RestExchangeSource, StatusCheck};

pub use classifier::{Classifier, FlagEncoding, StatusRule};

pub use domain::{
    parse_calendar_date, FlagValue, InstrumentDescriptor, PairFormat, StatusRecord, UtcDateTime,
};

pub use error::ValidationError;

pub use exchange::ExchangeId;

pub use exchange_source::{ExchangeSource, InstrumentBatch, SourceError, SourceErrorKind};

pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

pub use orchestrator::{Orchestrator, OrchestratorBuilder, RunSummary};

pub use pagination::{Page, PageFetcher, Paginated, PaginationAnomaly, PaginationDriver};

pub use pipeline::{ExchangeOutcome, ExchangePipeline, PipelineError};

pub use profile::{CursorPagination, ExchangeProfile, ProfileOverrides};

pub use stwatch_ledger::{LedgerError, LedgerRow, LedgerSchema, LedgerStore, MergeReport};
