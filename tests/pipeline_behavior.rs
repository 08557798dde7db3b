//! Behavior-driven tests for multi-exchange runs.
//!
//! These tests drive the orchestrator end to end against scripted HTTP
//! responses and real ledger files in a temporary directory.

use std::sync::Arc;

use stwatch_tests::{
    ExchangeId, ExchangeProfile, HttpError, HttpResponse, LedgerStore, Orchestrator,
    PipelineError, ScriptedExchanges, SourceErrorKind, UtcDateTime,
};
use tempfile::tempdir;

const OKX_URL: &str = "http://okx.test/api/v5/public/instruments";
const KUCOIN_URL: &str = "http://kucoin.test/api/v2/symbols";
const HUOBI_URL: &str = "http://huobi.test/v1/settings/common/symbols";
const BYBIT_URL: &str = "http://bybit.test/v5/market/instruments-info";

fn local(exchange: ExchangeId, url: &str) -> ExchangeProfile {
    ExchangeProfile::builtin(exchange)
        .without_delays()
        .with_url(url)
}

fn okx_body() -> HttpResponse {
    HttpResponse::ok_json(
        r#"{"code":"0","msg":"","data":[
            {"instId":"BTC-USDT","baseCcy":"BTC","quoteCcy":"USDT","state":"live","minSz":"0.00001","tickSz":"0.1"},
            {"instId":"LUNA-USDT","baseCcy":"LUNA","quoteCcy":"USDT","state":"suspend","minSz":"1","tickSz":"0.0001"}
        ]}"#,
    )
}

fn kucoin_body() -> HttpResponse {
    HttpResponse::ok_json(
        r#"{"code":"200000","data":[
            {"symbol":"ABC-USDT","baseCurrency":"ABC","quoteCurrency":"USDT","st":"true","enableTrading":true},
            {"symbol":"DEF-USDT","baseCurrency":"DEF","quoteCurrency":"USDT","st":"false","enableTrading":true}
        ]}"#,
    )
}

fn at(timestamp: &str) -> UtcDateTime {
    UtcDateTime::parse(timestamp).expect("valid timestamp")
}

// =============================================================================
// Partial-failure isolation
// =============================================================================

#[tokio::test]
async fn one_unreachable_exchange_does_not_block_the_others() {
    // Given: Three exchanges, Huobi unreachable
    let dir = tempdir().expect("tempdir");
    let client = Arc::new(
        ScriptedExchanges::default()
            .respond(OKX_URL, vec![Ok(okx_body())])
            .respond(KUCOIN_URL, vec![Ok(kucoin_body())])
            .respond(HUOBI_URL, vec![Err(HttpError::new("connection timed out"))]),
    );
    let orchestrator = Orchestrator::builder()
        .with_profile(local(ExchangeId::Okx, OKX_URL))
        .with_profile(local(ExchangeId::Huobi, HUOBI_URL))
        .with_profile(local(ExchangeId::Kucoin, KUCOIN_URL))
        .with_http_client(client)
        .with_ledger_dir(dir.path())
        .build();

    // When: A run is executed
    let summary = orchestrator.run_at(at("2024-01-01T06:00:00Z")).await;

    // Then: Exactly one failure is reported, naming Huobi
    assert_eq!(summary.failed_count(), 1);
    assert!(!summary.all_failed());
    let huobi = &summary.outcomes[1];
    assert_eq!(huobi.exchange, ExchangeId::Huobi);
    let failure = huobi.failure.as_ref().expect("huobi failed");
    assert_eq!(failure.exchange(), ExchangeId::Huobi);
    assert_eq!(failure.code(), "source.transport");

    // And: The other two ledgers were updated with their special pairs
    assert_eq!(summary.outcomes[0].added_pairs, vec!["LUNA-USDT"]);
    assert_eq!(summary.outcomes[2].added_pairs, vec!["ABC-USDT"]);
    assert!(dir.path().join("ST_OKX.csv").exists());
    assert!(dir.path().join("ST_KuCoin.csv").exists());
    assert!(!dir.path().join("ST_Huobi.csv").exists());

    // And: OKX rows carry its extra columns
    let okx_profile = ExchangeProfile::builtin(ExchangeId::Okx);
    let okx_rows = LedgerStore::new(
        okx_profile.ledger_path(dir.path()),
        okx_profile.ledger_schema(),
    )
    .read_rows()
    .expect("okx ledger readable");
    assert_eq!(okx_rows.len(), 1);
    assert_eq!(
        okx_rows[0].extras.get("tick_size").map(String::as_str),
        Some("0.0001")
    );
}

#[tokio::test]
async fn every_exchange_failing_is_reported_as_total_failure() {
    let dir = tempdir().expect("tempdir");
    let orchestrator = Orchestrator::builder()
        .with_profile(local(ExchangeId::Okx, OKX_URL))
        .with_profile(local(ExchangeId::Kucoin, KUCOIN_URL))
        .with_http_client(Arc::new(ScriptedExchanges::default()))
        .with_ledger_dir(dir.path())
        .build();

    let summary = orchestrator.run().await;

    assert!(summary.all_failed());
    assert_eq!(summary.records_added(), 0);
}

// =============================================================================
// Application-level errors
// =============================================================================

#[tokio::test]
async fn envelope_error_fails_the_run_without_touching_the_ledger() {
    // Given: OKX answers 200 with an error code, after a successful earlier run
    let dir = tempdir().expect("tempdir");
    let client = Arc::new(ScriptedExchanges::default().respond(
        OKX_URL,
        vec![
            Ok(okx_body()),
            Ok(HttpResponse::ok_json(
                r#"{"code":"50011","msg":"Too Many Requests","data":[]}"#,
            )),
        ],
    ));
    let orchestrator = Orchestrator::builder()
        .with_profile(local(ExchangeId::Okx, OKX_URL))
        .with_http_client(client)
        .with_ledger_dir(dir.path())
        .build();
    orchestrator.run_at(at("2024-01-01T06:00:00Z")).await;
    let before = std::fs::read(dir.path().join("ST_OKX.csv")).expect("ledger bytes");

    // When: The next day's run hits the error envelope
    let summary = orchestrator.run_at(at("2024-01-02T06:00:00Z")).await;

    // Then: The run failed as an application error and the ledger is unchanged
    let failure = summary.outcomes[0].failure.as_ref().expect("run failed");
    assert_eq!(failure.code(), "source.application");
    assert!(failure.to_string().contains("Too Many Requests"));
    assert_eq!(summary.outcomes[0].fetched, 0);
    let after = std::fs::read(dir.path().join("ST_OKX.csv")).expect("ledger bytes");
    assert_eq!(before, after);
}

// =============================================================================
// Idempotence and pagination
// =============================================================================

#[tokio::test]
async fn rerunning_on_the_same_day_adds_nothing() {
    let dir = tempdir().expect("tempdir");
    let client = Arc::new(
        ScriptedExchanges::default().respond(KUCOIN_URL, vec![Ok(kucoin_body()), Ok(kucoin_body())]),
    );
    let orchestrator = Orchestrator::builder()
        .with_profile(local(ExchangeId::Kucoin, KUCOIN_URL))
        .with_http_client(client)
        .with_ledger_dir(dir.path())
        .build();

    let first = orchestrator.run_at(at("2024-02-10T01:00:00Z")).await;
    let second = orchestrator.run_at(at("2024-02-10T23:00:00Z")).await;

    assert_eq!(first.records_added(), 1);
    assert_eq!(second.records_added(), 0);
    assert_eq!(second.records_skipped(), 1);
}

#[tokio::test]
async fn repeated_cursor_is_a_warning_not_a_failure() {
    // Given: Bybit keeps returning the same cursor
    let dir = tempdir().expect("tempdir");
    let page = |symbol: &str| {
        HttpResponse::ok_json(format!(
            r#"{{"retCode":0,"result":{{"list":[{{"symbol":"{symbol}USDT","baseCoin":"{symbol}","quoteCoin":"USDT","stTag":"1"}}],"nextPageCursor":"stuck"}}}}"#
        ))
    };
    let client = Arc::new(
        ScriptedExchanges::default().respond(BYBIT_URL, vec![Ok(page("AAA")), Ok(page("BBB"))]),
    );
    let orchestrator = Orchestrator::builder()
        .with_profile(local(ExchangeId::Bybit, BYBIT_URL))
        .with_http_client(client.clone())
        .with_ledger_dir(dir.path())
        .build();

    // When: A run is executed
    let summary = orchestrator.run().await;

    // Then: Both pages were used, the run succeeded and carries a warning
    let outcome = &summary.outcomes[0];
    assert!(outcome.succeeded());
    assert_eq!(outcome.added_pairs, vec!["AAA/USDT", "BBB/USDT"]);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("stuck"));
    assert_eq!(client.requests_to(BYBIT_URL).len(), 2);
}

#[tokio::test]
async fn huobi_entries_with_null_tags_are_not_special() {
    let dir = tempdir().expect("tempdir");
    let client = Arc::new(ScriptedExchanges::default().respond(
        HUOBI_URL,
        vec![Ok(HttpResponse::ok_json(
            r#"{"status":"ok","data":[
                {"symbol":"aaausdt","bc":"aaa","qc":"usdt","state":"online","tags":null},
                {"symbol":"bbbusdt","bc":"bbb","qc":"usdt","state":null},
                {"symbol":"cccusdt","bc":"ccc","qc":"usdt","state":"online","tags":"st"},
                {"symbol":"dddusdt","bc":"ddd","qc":"usdt","state":"suspend","tags":""}
            ]}"#,
        ))],
    ));
    let orchestrator = Orchestrator::builder()
        .with_profile(local(ExchangeId::Huobi, HUOBI_URL))
        .with_http_client(client)
        .with_ledger_dir(dir.path())
        .build();

    let summary = orchestrator.run().await;

    let outcome = &summary.outcomes[0];
    assert!(outcome.succeeded(), "{:?}", outcome.failure);
    assert_eq!(outcome.fetched, 4);
    assert_eq!(outcome.added_pairs, vec!["cccusdt", "dddusdt"]);
}

#[tokio::test]
async fn parse_failures_are_classified() {
    let dir = tempdir().expect("tempdir");
    let client = Arc::new(ScriptedExchanges::default().respond(
        KUCOIN_URL,
        vec![Ok(HttpResponse::ok_json(r#"{"code":"200000"}"#))],
    ));
    let orchestrator = Orchestrator::builder()
        .with_profile(local(ExchangeId::Kucoin, KUCOIN_URL))
        .with_http_client(client)
        .with_ledger_dir(dir.path())
        .build();

    let summary = orchestrator.run().await;

    let failure = summary.outcomes[0].failure.as_ref().expect("run failed");
    assert!(matches!(
        failure,
        PipelineError::Source { source, .. } if source.kind() == SourceErrorKind::Parse
    ));
}
