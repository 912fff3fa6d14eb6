//! Integration tests for mail-sentinel.
//!
//! These tests require a real IMAP server and are disabled by default.
//! To run them:
//!
//! ```bash
//! # Set environment variables
//! export MAIL_SENTINEL_TEST_HOST="imap.gmail.com"
//! export MAIL_SENTINEL_TEST_LOGIN="your@email.com"
//! export MAIL_SENTINEL_TEST_PASSWORD="your-app-password"
//!
//! # Optional: folder to exercise (defaults to INBOX)
//! export MAIL_SENTINEL_TEST_FOLDER="INBOX"
//!
//! # Run with the integration-tests feature
//! cargo test --features integration-tests -- --ignored
//! ```

use mail_sentinel::{
    FailureClass, ImapConnector, MailTransport, TransportConnector, WatchConfig,
};
use std::env;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Test Configuration Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn get_test_credentials() -> Option<(String, String, String)> {
    dotenvy::dotenv().ok();
    let host = env::var("MAIL_SENTINEL_TEST_HOST").ok()?;
    let login = env::var("MAIL_SENTINEL_TEST_LOGIN").ok()?;
    let password = env::var("MAIL_SENTINEL_TEST_PASSWORD").ok()?;
    Some((host, login, password))
}

fn get_test_folder() -> String {
    env::var("MAIL_SENTINEL_TEST_FOLDER").unwrap_or_else(|_| "INBOX".to_string())
}

fn get_test_config() -> Option<WatchConfig> {
    let (host, login, password) = get_test_credentials()?;

    WatchConfig::builder()
        .host(host)
        .login(login)
        .secret(password)
        .folder(get_test_folder())
        .webhook_url("https://hooks.invalid/unused")
        .build()
        .ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_connect_and_authenticate() {
    let config = get_test_config().expect("Test config from environment variables");
    let connector = ImapConnector::new(&config);

    let mut transport = connector.connect().await.expect("Failed to connect");

    transport
        .authenticate(&config.login, config.secret())
        .await
        .expect("Failed to authenticate");
}

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_select_folder_and_search() {
    let config = get_test_config().expect("Test config from environment variables");
    let connector = ImapConnector::new(&config);

    let mut transport = connector.connect().await.expect("Failed to connect");
    transport
        .authenticate(&config.login, config.secret())
        .await
        .expect("Failed to authenticate");
    transport
        .select_folder(&config.folder)
        .await
        .expect("Failed to select folder");

    let uids = transport
        .search_unseen()
        .await
        .expect("Failed to search unseen messages");

    // Identifiers come back ascending.
    assert!(uids.windows(2).all(|pair| pair[0] < pair[1]));

    // Fetch whatever is there; each unread message must carry raw content.
    for uid in uids {
        let raw = transport.fetch(uid).await.expect("Failed to fetch message");
        assert!(!raw.is_empty());
    }
}

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_idle_times_out_and_keepalive_succeeds() {
    let config = get_test_config().expect("Test config from environment variables");
    let connector = ImapConnector::new(&config);

    let mut transport = connector.connect().await.expect("Failed to connect");
    transport
        .authenticate(&config.login, config.secret())
        .await
        .expect("Failed to authenticate");
    transport
        .select_folder(&config.folder)
        .await
        .expect("Failed to select folder");

    // A short wait on a quiet mailbox usually times out; either way the
    // session must survive the round and accept a keepalive.
    let _activity = transport
        .idle_wait(Duration::from_secs(5))
        .await
        .expect("IDLE round failed");

    transport.keepalive().await.expect("Keepalive failed");
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires intentionally wrong credentials"]
async fn test_rejected_login_classifies_as_credential_rotation() {
    let (host, login, _) = get_test_credentials().expect("Test host from environment variables");

    let config = WatchConfig::builder()
        .host(host)
        .login(login)
        .secret("wrong-password")
        .webhook_url("https://hooks.invalid/unused")
        .build()
        .expect("valid config structure");

    let connector = ImapConnector::new(&config);
    let mut transport = connector.connect().await.expect("Failed to connect");

    let err = transport
        .authenticate(&config.login, config.secret())
        .await
        .expect_err("wrong password must be rejected");

    // Gmail answers a bad password with its invalid-credentials phrase.
    println!("Login error: {err}");
    assert_eq!(err.failure_class(), FailureClass::TerminalCredential);
}

#[tokio::test]
async fn test_connect_to_unreachable_server_is_transient() {
    let config = WatchConfig::builder()
        .host("127.0.0.1")
        .port(1)
        .tls(false)
        .login("user@example.com")
        .secret("secret")
        .webhook_url("https://hooks.invalid/unused")
        .build()
        .expect("valid config structure");

    let connector = ImapConnector::new(&config);
    let err = connector.connect().await.expect_err("port 1 must refuse");

    assert_eq!(err.failure_class(), FailureClass::TransientConnect);
}

#[tokio::test]
async fn test_missing_required_fields() {
    // Missing host
    let result = WatchConfig::builder()
        .login("user@example.com")
        .secret("secret")
        .webhook_url("https://hooks.invalid/unused")
        .build();
    assert!(result.is_err());

    // Missing webhook endpoint
    let result = WatchConfig::builder()
        .host("imap.example.com")
        .login("user@example.com")
        .secret("secret")
        .build();
    assert!(result.is_err());
}
