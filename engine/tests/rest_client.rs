//! Integration tests for the JSON-over-HTTP service client.
//!
//! Each test mounts the endpoints one call needs on a local mock server and
//! checks both the request the client sends and how it unwraps the
//! `{ok, description, result}` envelope.

use serde_json::json;
use ussd_engine::services::AccountService;
use ussd_engine::{HttpAccountService, ServiceError};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> HttpAccountService {
    HttpAccountService::new(&server.uri(), &server.uri()).unwrap()
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "ok": true,
        "description": "",
        "result": result,
    }))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/account/create"))
        .respond_with(ok(json!({
            "trackingId": "T1",
            "publicKey": "0xabc0000000000000000000000000000000000def",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let account = client(&server).await.create_account().await.unwrap();
    assert_eq!(account.tracking_id, "T1");
    assert_eq!(
        account.public_key,
        "0xabc0000000000000000000000000000000000def"
    );
}

#[tokio::test]
async fn test_account_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/account/status/0xabc"))
        .respond_with(ok(json!({ "active": true })))
        .mount(&server)
        .await;

    let status = client(&server)
        .await
        .track_account_status("0xabc")
        .await
        .unwrap();
    assert!(status.active);
}

// ---------------------------------------------------------------------------
// Data API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_fetch_vouchers_unwraps_holdings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/token-holdings/0xabc"))
        .respond_with(ok(json!({
            "holdings": [
                {
                    "tokenAddress": "0x1111111111111111111111111111111111111111",
                    "tokenSymbol": "SRF",
                    "tokenDecimals": "6",
                    "balance": "10967000"
                },
                {
                    "tokenAddress": "0x2222222222222222222222222222222222222222",
                    "tokenSymbol": "MILO",
                    "tokenDecimals": "6",
                    "balance": "5000000"
                }
            ]
        })))
        .mount(&server)
        .await;

    let holdings = client(&server).await.fetch_vouchers("0xabc").await.unwrap();
    assert_eq!(holdings.len(), 2);
    assert_eq!(holdings[0].token_symbol, "SRF");
    assert_eq!(holdings[0].balance, "10967000");
    assert_eq!(holdings[1].token_decimals, "6");
}

#[tokio::test]
async fn test_fetch_transactions_parses_dates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/token-transfers/last10/0xabc"))
        .respond_with(ok(json!({
            "transfers": [{
                "sender": "0xabc",
                "recipient": "0xdef",
                "transferValue": "1000000",
                "contractAddress": "0x1111111111111111111111111111111111111111",
                "txHash": "0xfeed",
                "dateBlock": "2024-09-12T08:30:00Z",
                "tokenSymbol": "SRF",
                "tokenDecimals": "6"
            }]
        })))
        .mount(&server)
        .await;

    let transfers = client(&server)
        .await
        .fetch_transactions("0xabc")
        .await
        .unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].tx_hash, "0xfeed");
    assert_eq!(transfers[0].date_block.to_rfc3339(), "2024-09-12T08:30:00+00:00");
}

#[tokio::test]
async fn test_alias_lookup_miss_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/alias/nobody.sarafu.eth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "alias not found",
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .check_alias_address("nobody.sarafu.eth")
        .await
        .unwrap_err();
    match err {
        ServiceError::Api { description } => assert_eq!(description, "alias not found"),
        other => panic!("expected api error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Custodial API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_token_transfer_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/token/transfer"))
        .and(body_json(json!({
            "amount": "1000000",
            "from": "0xme",
            "to": "0xfriend",
            "tokenAddress": "0xtoken",
        })))
        .respond_with(ok(json!({ "trackingId": "TX-9" })))
        .expect(1)
        .mount(&server)
        .await;

    let res = client(&server)
        .await
        .token_transfer("1000000", "0xme", "0xfriend", "0xtoken")
        .await
        .unwrap();
    assert_eq!(res.tracking_id, "TX-9");
}

#[tokio::test]
async fn test_http_failure_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/pool/swap"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .pool_swap("1", "0xme", "0xa", "0xpool", "0xb")
        .await
        .unwrap_err();
    match err {
        ServiceError::Http { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sms_without_result_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/external/upsell"))
        .and(body_json(json!({
            "inviterPhoneNumber": "+254700000000",
            "inviteePhoneNumber": "0712345678",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .send_upsell_sms("+254700000000", "0712345678")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_result_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pool/top"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let err = client(&server).await.fetch_top_pools().await.unwrap_err();
    assert!(matches!(err, ServiceError::Api { .. }));
}
