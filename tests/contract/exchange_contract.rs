//! Contract tests run against every supported exchange profile.
//!
//! Each case feeds a recorded-style listing with one special and one ordinary
//! entry through the real adapter and classifier, and checks the pair that
//! would reach the ledger.

use std::sync::Arc;

use stwatch_tests::{
    ExchangeId, ExchangeProfile, ExchangeSource, FixedResponse, RestExchangeSource,
    SourceErrorKind, UtcDateTime,
};

struct ContractCase {
    exchange: ExchangeId,
    body: &'static str,
    special_pair: &'static str,
    expected_detail: &'static [(&'static str, &'static str)],
    error_body: Option<&'static str>,
}

fn cases() -> Vec<ContractCase> {
    vec![
        ContractCase {
            exchange: ExchangeId::Bitget,
            body: r#"{"code":"00000","msg":"success","data":[
                {"symbol":"ABCUSDT","baseCoin":"ABC","quoteCoin":"USDT","status":"Gray","minTradeAmount":"0","maxTradeAmount":"10000"},
                {"symbol":"BTCUSDT","baseCoin":"BTC","quoteCoin":"USDT","status":"online"}
            ]}"#,
            special_pair: "ABCUSDT",
            expected_detail: &[("status", "Gray"), ("max_trade_amount", "10000")],
            error_body: Some(r#"{"code":"40001","msg":"bad request","data":null}"#),
        },
        ContractCase {
            exchange: ExchangeId::Bybit,
            body: r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[
                {"symbol":"ABCUSDT","baseCoin":"ABC","quoteCoin":"USDT","stTag":"1","status":"Trading"},
                {"symbol":"BTCUSDT","baseCoin":"BTC","quoteCoin":"USDT","stTag":"0","status":"Trading"}
            ],"nextPageCursor":""}}"#,
            special_pair: "ABC/USDT",
            expected_detail: &[],
            error_body: Some(r#"{"retCode":10001,"retMsg":"params error","result":{}}"#),
        },
        ContractCase {
            exchange: ExchangeId::Coinbase,
            body: r#"[
                {"id":"ABC-USD","base_currency":"ABC","quote_currency":"USD","status":"delisted"},
                {"id":"XYZ-USD","base_currency":"XYZ","quote_currency":"USD","status":"disabled"}
            ]"#,
            special_pair: "XYZ-USD",
            expected_detail: &[("status", "disabled")],
            error_body: Some(r#"{"message":"Unauthorized."}"#),
        },
        ContractCase {
            exchange: ExchangeId::Gateio,
            body: r#"[
                {"id":"ABC_USDT","base":"ABC","quote":"USDT","trade_status":"tradable","st_tag":true},
                {"id":"BTC_USDT","base":"BTC","quote":"USDT","trade_status":"tradable","st_tag":false}
            ]"#,
            special_pair: "ABC_USDT",
            expected_detail: &[("st_tag", "true")],
            error_body: Some(r#"{"label":"TOO_MANY_REQUESTS","message":"Request Rate limit Exceeded"}"#),
        },
        ContractCase {
            exchange: ExchangeId::Huobi,
            body: r#"{"status":"ok","data":[
                {"symbol":"abcusdt","bc":"abc","qc":"usdt","state":"online","tags":"st,hadax"},
                {"symbol":"btcusdt","bc":"btc","qc":"usdt","state":"online","tags":""}
            ]}"#,
            special_pair: "abcusdt",
            expected_detail: &[("state", "online"), ("tags", "st,hadax")],
            error_body: Some(r#"{"status":"error","err-code":"bad-request","err-msg":"invalid"}"#),
        },
        ContractCase {
            exchange: ExchangeId::Kucoin,
            body: r#"{"code":"200000","data":[
                {"symbol":"ABC-USDT","baseCurrency":"ABC","quoteCurrency":"USDT","st":"true","enableTrading":true},
                {"symbol":"BTC-USDT","baseCurrency":"BTC","quoteCurrency":"USDT","st":"false","enableTrading":true}
            ]}"#,
            special_pair: "ABC-USDT",
            expected_detail: &[("st", "true"), ("enable_trading", "true")],
            error_body: Some(r#"{"code":"400100","msg":"Parameter error"}"#),
        },
        ContractCase {
            exchange: ExchangeId::Mexc,
            body: r#"{"timezone":"CST","symbols":[
                {"symbol":"ABCUSDT","baseAsset":"ABC","quoteAsset":"USDT","status":"1","st":true},
                {"symbol":"BTCUSDT","baseAsset":"BTC","quoteAsset":"USDT","status":"1","st":false}
            ]}"#,
            special_pair: "ABC/USDT",
            expected_detail: &[],
            error_body: Some(r#"{"code":700003,"msg":"Timestamp for this request is outside of the recvWindow."}"#),
        },
        ContractCase {
            exchange: ExchangeId::Okx,
            body: r#"{"code":"0","msg":"","data":[
                {"instId":"ABC-USDT","baseCcy":"ABC","quoteCcy":"USDT","state":"suspend","minSz":"1","tickSz":"0.001"},
                {"instId":"BTC-USDT","baseCcy":"BTC","quoteCcy":"USDT","state":"live","minSz":"0.00001","tickSz":"0.1"}
            ]}"#,
            special_pair: "ABC-USDT",
            expected_detail: &[("state", "suspend"), ("min_order_size", "1"), ("tick_size", "0.001")],
            error_body: Some(r#"{"code":"51000","msg":"Parameter instType error","data":[]}"#),
        },
    ]
}

fn adapter(exchange: ExchangeId, body: &str) -> RestExchangeSource {
    RestExchangeSource::new(
        ExchangeProfile::builtin(exchange).without_delays(),
        Arc::new(FixedResponse(body.to_owned())),
    )
}

#[test]
fn contract_covers_every_exchange() {
    let covered = cases().iter().map(|case| case.exchange).collect::<Vec<_>>();
    assert_eq!(covered, ExchangeId::ALL.to_vec());
}

#[tokio::test]
async fn each_exchange_reports_exactly_its_special_pair() {
    let observed_at = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid timestamp");

    for case in cases() {
        let source = adapter(case.exchange, case.body);
        assert_eq!(source.id(), case.exchange);

        let batch = source
            .fetch_instruments()
            .await
            .unwrap_or_else(|error| panic!("{}: fetch failed: {error}", case.exchange));
        assert_eq!(batch.descriptors.len(), 2, "{}", case.exchange);

        let records = source
            .profile()
            .classifier()
            .classify_all(&batch.descriptors, observed_at);
        assert_eq!(records.len(), 1, "{}", case.exchange);

        let record = &records[0];
        assert_eq!(record.pair, case.special_pair, "{}", case.exchange);
        for (column, value) in case.expected_detail {
            assert_eq!(
                record.detail.get(*column).map(String::as_str),
                Some(*value),
                "{}: column {column}",
                case.exchange
            );
        }
        for column in record.detail.keys() {
            assert!(
                source.profile().detail_columns.contains(column),
                "{}: unexpected column {column}",
                case.exchange
            );
        }
    }
}

#[tokio::test]
async fn each_exchange_surfaces_its_error_envelope() {
    for case in cases() {
        let Some(error_body) = case.error_body else {
            continue;
        };
        let error = adapter(case.exchange, error_body)
            .fetch_instruments()
            .await
            .expect_err("error envelope must fail the fetch");

        assert_eq!(
            error.kind(),
            SourceErrorKind::Application,
            "{}: {error}",
            case.exchange
        );
    }
}
