//! New-user eligibility integration tests against a mock transactions service.

mod common;

use common::TestHarness;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn existing_user_is_not_rewarded() {
    let transactions = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .and(query_param("userAddress", "0xBBB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactions": [{"id": "tx_1"}]
        })))
        .expect(1)
        .mount(&transactions)
        .await;

    let harness = TestHarness::with_transactions_url(&transactions.uri());
    let code = harness.generate_code("0xAAA").await;

    let body = harness.convert("0xBBB", &code).await;
    assert_eq!(
        body["message"],
        "User already has transactions, not eligible for referral"
    );
    assert_eq!(body["status"], "not_new_user");

    let stats = harness.stats("0xAAA").await;
    assert_eq!(stats["stats"]["totalRewards"], 0);
    assert_eq!(stats["stats"]["totalConversions"], 0);
}

#[tokio::test]
async fn new_user_is_rewarded() {
    let transactions = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "transactions": [] })))
        .mount(&transactions)
        .await;

    let harness = TestHarness::with_transactions_url(&transactions.uri());
    let code = harness.generate_code("0xAAA").await;

    let body = harness.convert("0xBBB", &code).await;
    assert_eq!(body["status"], "converted");
    assert_eq!(body["referralReward"], 5);
}

#[tokio::test]
async fn failing_transactions_service_fails_open() {
    let transactions = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&transactions)
        .await;

    let harness = TestHarness::with_transactions_url(&transactions.uri());
    let code = harness.generate_code("0xAAA").await;

    let body = harness.convert("0xBBB", &code).await;
    assert_eq!(body["status"], "converted");

    let stats = harness.stats("0xAAA").await;
    assert_eq!(stats["stats"]["totalRewards"], 5);
}

#[tokio::test]
async fn self_referral_skips_eligibility_check() {
    let transactions = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "transactions": [] })))
        .expect(0)
        .mount(&transactions)
        .await;

    let harness = TestHarness::with_transactions_url(&transactions.uri());
    let code = harness.generate_code("0xAAA").await;

    harness
        .server
        .post("/referrals/convert")
        .json(&json!({ "newUserWalletAddress": "0xAAA", "referralCode": code }))
        .await
        .assert_status_bad_request();
}
