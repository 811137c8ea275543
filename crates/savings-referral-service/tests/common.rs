//! Common test utilities for savings-referral integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use savings_referral_service::{create_router, AppState, ServiceConfig};
use savings_referral_store::RocksStore;

/// Base URL used for referral links in tests.
pub const APP_BASE_URL: &str = "https://save.example.com";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and no transactions service.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a test harness whose eligibility check calls `url`.
    pub fn with_transactions_url(url: &str) -> Self {
        Self::build(Some(url.to_string()))
    }

    fn build(transactions_api_url: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            app_base_url: APP_BASE_URL.into(),
            transactions_api_url,
            transactions_api_key: None,
            eligibility_timeout_ms: 1000,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        };

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
        }
    }

    /// Generate a referral code for `wallet` and return it.
    pub async fn generate_code(&self, wallet: &str) -> String {
        let response = self
            .server
            .post("/referrals/generate")
            .json(&json!({ "walletAddress": wallet }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        body["referralCode"]
            .as_str()
            .expect("referralCode missing")
            .to_string()
    }

    /// Track a visit and return the response body.
    pub async fn track(&self, code: &str, visitor: Option<&str>) -> Value {
        let response = self
            .server
            .post("/referrals/track")
            .json(&json!({
                "referralCode": code,
                "visitorWalletAddress": visitor,
            }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Record a conversion and return the response body.
    pub async fn convert(&self, new_user: &str, code: &str) -> Value {
        let response = self
            .server
            .post("/referrals/convert")
            .json(&json!({
                "newUserWalletAddress": new_user,
                "referralCode": code,
            }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Fetch stats for `wallet`.
    pub async fn stats(&self, wallet: &str) -> Value {
        let response = self
            .server
            .get("/referrals/track")
            .add_query_param("walletAddress", wallet)
            .await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// The connected-wallet header name.
pub fn wallet_header() -> HeaderName {
    HeaderName::from_static("x-wallet-address")
}

/// A connected-wallet header value.
pub fn wallet_value(wallet: &str) -> HeaderValue {
    HeaderValue::from_str(wallet).expect("invalid header value")
}
