//! Concurrent multi-exchange runs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use stwatch_ledger::LedgerStore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::adapters::RestExchangeSource;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::pipeline::{ExchangeOutcome, ExchangePipeline, PipelineError};
use crate::profile::ExchangeProfile;
use crate::UtcDateTime;

/// Summary of one run across every selected exchange.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: UtcDateTime,
    pub latency_ms: u64,
    pub outcomes: Vec<ExchangeOutcome>,
}

impl RunSummary {
    pub fn succeeded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.succeeded())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }

    /// True when there was at least one exchange and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded_count() == 0
    }

    pub fn records_added(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| outcome.records_added)
            .sum()
    }

    pub fn records_skipped(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| outcome.records_skipped)
            .sum()
    }
}

/// Runs exchange pipelines concurrently, one task each.
pub struct Orchestrator {
    pipelines: Vec<Arc<ExchangePipeline>>,
}

impl Orchestrator {
    pub fn new(pipelines: Vec<ExchangePipeline>) -> Self {
        Self {
            pipelines: pipelines.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn pipelines(&self) -> impl Iterator<Item = &ExchangePipeline> {
        self.pipelines.iter().map(Arc::as_ref)
    }

    pub async fn run(&self) -> RunSummary {
        self.run_at(UtcDateTime::now()).await
    }

    /// Runs every pipeline with a shared observation instant. Outcomes keep
    /// pipeline order.
    pub async fn run_at(&self, observed_at: UtcDateTime) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(%run_id, exchanges = self.pipelines.len(), "run started");

        let mut tasks = JoinSet::new();
        for (index, pipeline) in self.pipelines.iter().enumerate() {
            let pipeline = Arc::clone(pipeline);
            tasks.spawn(async move { (index, pipeline.run(observed_at).await) });
        }

        let mut slots: Vec<Option<ExchangeOutcome>> =
            self.pipelines.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(error) => tracing::warn!(%run_id, %error, "pipeline task aborted"),
            }
        }

        let outcomes = slots
            .into_iter()
            .zip(&self.pipelines)
            .map(|(slot, pipeline)| {
                slot.unwrap_or_else(|| {
                    let exchange = pipeline.exchange();
                    ExchangeOutcome::failed(
                        exchange,
                        PipelineError::Task {
                            exchange,
                            message: String::from("task panicked or was cancelled"),
                        },
                        0,
                    )
                })
            })
            .collect();

        let summary = RunSummary {
            run_id,
            started_at: observed_at,
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcomes,
        };
        tracing::info!(
            %run_id,
            succeeded = summary.succeeded_count(),
            failed = summary.failed_count(),
            added = summary.records_added(),
            "run finished"
        );
        summary
    }
}

/// Wires profiles, transport and ledger directory into pipelines.
pub struct OrchestratorBuilder {
    profiles: Vec<ExchangeProfile>,
    http_client: Option<Arc<dyn HttpClient>>,
    ledger_dir: PathBuf,
    lock_timeout: Option<Duration>,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            http_client: None,
            ledger_dir: PathBuf::from("."),
            lock_timeout: None,
        }
    }
}

impl OrchestratorBuilder {
    pub fn with_profiles(mut self, profiles: Vec<ExchangeProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_profile(mut self, profile: ExchangeProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_ledger_dir(mut self, ledger_dir: impl Into<PathBuf>) -> Self {
        self.ledger_dir = ledger_dir.into();
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = Some(lock_timeout);
        self
    }

    pub fn build(self) -> Orchestrator {
        let http_client: Arc<dyn HttpClient> = match self.http_client {
            Some(http_client) => http_client,
            None => Arc::new(ReqwestHttpClient::default()),
        };

        let pipelines = self
            .profiles
            .iter()
            .map(|profile| {
                let mut ledger =
                    LedgerStore::new(profile.ledger_path(&self.ledger_dir), profile.ledger_schema());
                if let Some(timeout) = self.lock_timeout {
                    ledger = ledger.with_lock_timeout(timeout);
                }
                let source = Arc::new(RestExchangeSource::new(
                    profile.clone(),
                    Arc::clone(&http_client),
                ));
                ExchangePipeline::new(profile, source, ledger)
            })
            .collect();

        Orchestrator::new(pipelines)
    }
}
