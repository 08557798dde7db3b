//! One exchange's run: fetch, classify, merge into the ledger.

use std::sync::Arc;
use std::time::Instant;

use serde::{Serialize, Serializer};
use stwatch_ledger::{LedgerError, LedgerStore};
use thiserror::Error;

use crate::classifier::Classifier;
use crate::exchange_source::{ExchangeSource, SourceError};
use crate::profile::ExchangeProfile;
use crate::{ExchangeId, UtcDateTime};

/// Failure of one exchange's run. Always names the exchange.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{exchange}: {source}")]
    Source {
        exchange: ExchangeId,
        #[source]
        source: SourceError,
    },

    #[error("{exchange}: {source}")]
    Ledger {
        exchange: ExchangeId,
        #[source]
        source: LedgerError,
    },

    #[error("{exchange}: run task failed: {message}")]
    Task {
        exchange: ExchangeId,
        message: String,
    },
}

impl PipelineError {
    pub const fn exchange(&self) -> ExchangeId {
        match self {
            Self::Source { exchange, .. }
            | Self::Ledger { exchange, .. }
            | Self::Task { exchange, .. } => *exchange,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Source { source, .. } => source.code(),
            Self::Ledger {
                source: LedgerError::Locked { .. },
                ..
            } => "ledger.locked",
            Self::Ledger {
                source: LedgerError::SchemaMismatch { .. },
                ..
            } => "ledger.schema_mismatch",
            Self::Ledger { .. } => "ledger.io",
            Self::Task { .. } => "run.task",
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Failure<'a> {
            code: &'a str,
            message: String,
        }

        Failure {
            code: self.code(),
            message: self.to_string(),
        }
        .serialize(serializer)
    }
}

/// Result of one exchange's run.
#[derive(Debug, Serialize)]
pub struct ExchangeOutcome {
    pub exchange: ExchangeId,
    pub fetched: usize,
    pub classified: usize,
    pub records_added: usize,
    pub records_skipped: usize,
    pub added_pairs: Vec<String>,
    pub warnings: Vec<String>,
    pub failure: Option<PipelineError>,
    pub latency_ms: u64,
}

impl ExchangeOutcome {
    pub fn failed(exchange: ExchangeId, failure: PipelineError, latency_ms: u64) -> Self {
        Self {
            exchange,
            fetched: 0,
            classified: 0,
            records_added: 0,
            records_skipped: 0,
            added_pairs: Vec::new(),
            warnings: Vec::new(),
            failure: Some(failure),
            latency_ms,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Fetch, classify and merge for a single exchange.
#[derive(Clone)]
pub struct ExchangePipeline {
    exchange: ExchangeId,
    source: Arc<dyn ExchangeSource>,
    classifier: Classifier,
    ledger: LedgerStore,
}

impl ExchangePipeline {
    pub fn new(
        profile: &ExchangeProfile,
        source: Arc<dyn ExchangeSource>,
        ledger: LedgerStore,
    ) -> Self {
        Self {
            exchange: profile.exchange,
            source,
            classifier: profile.classifier(),
            ledger,
        }
    }

    pub const fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// Runs the pipeline. Errors never escape; they land in the outcome.
    pub async fn run(&self, observed_at: UtcDateTime) -> ExchangeOutcome {
        let started = Instant::now();
        match self.try_run(observed_at).await {
            Ok(mut outcome) => {
                outcome.latency_ms = elapsed_ms(started);
                tracing::info!(
                    exchange = %self.exchange,
                    fetched = outcome.fetched,
                    classified = outcome.classified,
                    added = outcome.records_added,
                    skipped = outcome.records_skipped,
                    "exchange run complete"
                );
                outcome
            }
            Err(error) => {
                tracing::warn!(exchange = %self.exchange, code = error.code(), %error, "exchange run failed");
                ExchangeOutcome::failed(self.exchange, error, elapsed_ms(started))
            }
        }
    }

    async fn try_run(&self, observed_at: UtcDateTime) -> Result<ExchangeOutcome, PipelineError> {
        let exchange = self.exchange;
        let batch = self
            .source
            .fetch_instruments()
            .await
            .map_err(|source| PipelineError::Source { exchange, source })?;

        let records = self.classifier.classify_all(&batch.descriptors, observed_at);
        let classified = records.len();
        let candidates = records
            .into_iter()
            .map(|record| record.into_candidate())
            .collect::<Vec<_>>();

        let ledger = self.ledger.clone();
        let today = observed_at.date();
        let report = tokio::task::spawn_blocking(move || ledger.merge(candidates, today))
            .await
            .map_err(|error| PipelineError::Task {
                exchange,
                message: error.to_string(),
            })?
            .map_err(|source| PipelineError::Ledger { exchange, source })?;

        Ok(ExchangeOutcome {
            exchange,
            fetched: batch.descriptors.len(),
            classified,
            records_added: report.appended_count(),
            records_skipped: report.skipped_count(),
            added_pairs: report.appended,
            warnings: batch.warnings,
            failure: None,
            latency_ms: 0,
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange_source::InstrumentBatch;
    use crate::{FlagValue, InstrumentDescriptor};
    use std::future::Future;
    use std::pin::Pin;
    use tempfile::tempdir;

    struct FixedSource {
        exchange: ExchangeId,
        result: Result<InstrumentBatch, SourceError>,
    }

    impl ExchangeSource for FixedSource {
        fn id(&self) -> ExchangeId {
            self.exchange
        }

        fn fetch_instruments<'a>(
            &'a self,
        ) -> Pin<Box<dyn Future<Output = Result<InstrumentBatch, SourceError>> + Send + 'a>>
        {
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    fn kucoin_batch() -> InstrumentBatch {
        InstrumentBatch {
            descriptors: vec![
                InstrumentDescriptor::new("ABC-USDT", "ABC", "USDT")
                    .with_flag(FlagValue::Text(String::from("true")))
                    .with_detail("st", "true")
                    .with_detail("enable_trading", "true"),
                InstrumentDescriptor::new("XYZ-USDT", "XYZ", "USDT")
                    .with_flag(FlagValue::Text(String::from("false"))),
            ],
            pages: 1,
            warnings: Vec::new(),
        }
    }

    fn pipeline(
        dir: &std::path::Path,
        result: Result<InstrumentBatch, SourceError>,
    ) -> ExchangePipeline {
        let profile = ExchangeProfile::builtin(ExchangeId::Kucoin);
        let ledger = LedgerStore::new(profile.ledger_path(dir), profile.ledger_schema());
        let source = Arc::new(FixedSource {
            exchange: ExchangeId::Kucoin,
            result,
        });
        ExchangePipeline::new(&profile, source, ledger)
    }

    #[tokio::test]
    async fn special_pairs_are_merged_into_the_ledger() {
        let dir = tempdir().expect("tempdir");
        let pipeline = pipeline(dir.path(), Ok(kucoin_batch()));
        let observed_at = UtcDateTime::parse("2024-03-05T12:00:00Z").expect("valid timestamp");

        let outcome = pipeline.run(observed_at).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.fetched, 2);
        assert_eq!(outcome.classified, 1);
        assert_eq!(outcome.records_added, 1);
        assert_eq!(outcome.added_pairs, vec!["ABC-USDT"]);

        let rows = pipeline.ledger().read_rows().expect("ledger readable");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].extras.get("st").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn second_run_on_the_same_day_adds_nothing() {
        let dir = tempdir().expect("tempdir");
        let pipeline = pipeline(dir.path(), Ok(kucoin_batch()));
        let morning = UtcDateTime::parse("2024-03-05T08:00:00Z").expect("valid timestamp");
        let evening = UtcDateTime::parse("2024-03-05T20:00:00Z").expect("valid timestamp");

        pipeline.run(morning).await;
        let outcome = pipeline.run(evening).await;

        assert_eq!(outcome.records_added, 0);
        assert_eq!(outcome.records_skipped, 1);
    }

    #[tokio::test]
    async fn source_failure_leaves_no_ledger_file() {
        let dir = tempdir().expect("tempdir");
        let pipeline = pipeline(
            dir.path(),
            Err(SourceError::application("kucoin envelope code=400100: bad")),
        );

        let outcome = pipeline.run(UtcDateTime::now()).await;

        let failure = outcome.failure.as_ref().expect("run failed");
        assert_eq!(failure.exchange(), ExchangeId::Kucoin);
        assert_eq!(failure.code(), "source.application");
        assert!(!pipeline.ledger().path().exists());
    }

    #[test]
    fn failures_serialize_as_code_and_message() {
        let failure = PipelineError::Source {
            exchange: ExchangeId::Okx,
            source: SourceError::transport("okx transport error: timeout"),
        };
        let json = serde_json::to_value(&failure).expect("serializable");
        assert_eq!(json["code"], "source.transport");
        assert_eq!(
            json["message"],
            "okx: okx transport error: timeout (source.transport)"
        );
    }
}
