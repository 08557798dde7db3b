use std::sync::Arc;

use stwatch_core::{HttpClient, Orchestrator, ReqwestHttpClient, RunSummary};

use crate::cli::{Cli, ScanArgs};
use crate::config::Config;
use crate::error::CliError;

pub async fn run(args: &ScanArgs, cli: &Cli, config: &Config) -> Result<RunSummary, CliError> {
    let selection = config.selection(&args.exchanges)?;
    let profiles = selection
        .into_iter()
        .map(|exchange| config.profile(exchange, cli.timeout_ms))
        .collect::<Result<Vec<_>, _>>()?;

    let ledger_dir = config.ledger_dir(cli.ledger_dir.as_deref());
    std::fs::create_dir_all(&ledger_dir)?;

    let http_client: Arc<dyn HttpClient> = match &config.http.user_agent {
        Some(user_agent) => Arc::new(ReqwestHttpClient::with_user_agent(user_agent)),
        None => Arc::new(ReqwestHttpClient::new()),
    };

    tracing::debug!(
        ledger_dir = %ledger_dir.display(),
        exchanges = profiles.len(),
        "starting scan"
    );

    let orchestrator = Orchestrator::builder()
        .with_profiles(profiles)
        .with_http_client(http_client)
        .with_ledger_dir(ledger_dir)
        .with_lock_timeout(config.ledger.lock_timeout())
        .build();

    Ok(orchestrator.run().await)
}
