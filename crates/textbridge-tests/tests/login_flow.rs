use serde_json::json;
use textbridge::BridgeError;
use textbridge::session::MANUAL_DISPLAY_NAME;
use textbridge_tests::harness::{bridge::TestBridge, client::TestClient, closed_addr};
use wiremock::ResponseTemplate;

#[tokio::test]
async fn passphrase_login_installs_session_and_clears_draft() {
    let bridge = TestBridge::start().await;
    bridge
        .bootstrap_ok("s3cret", "Clinic", &["5551234567", "+1 (555) 987-6543"])
        .await;

    let mut client = TestClient::new(&bridge.uri()).unwrap();
    client.app.store_mut().set_draft("5550001111").unwrap();

    let session = client.app.login_with_passphrase("open sesame").await.unwrap();
    assert_eq!(session.secret(), "s3cret");
    assert_eq!(session.display_name, "Clinic");
    assert_eq!(session.default_recipients.len(), 2);
    assert_eq!(client.store().draft(), "");

    // Survives a restart, along with the bridge URL it was issued by.
    let client = client.reopen().unwrap();
    let stored = client.store().session().unwrap().unwrap();
    assert_eq!(stored, session);
    assert_eq!(client.store().bridge_url(), Some(bridge.uri()));
}

#[tokio::test]
async fn failed_bootstrap_reports_bridge_error_and_keeps_old_session() {
    let bridge = TestBridge::start().await;
    bridge
        .bootstrap_responds(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid passphrase" })),
            1,
        )
        .await;

    let mut client = TestClient::new(&bridge.uri()).unwrap();
    client.app.login_with_secret("old-secret").unwrap();
    client.app.store_mut().set_draft("5550001111").unwrap();

    let err = client.app.login_with_passphrase("wrong").await.unwrap_err();
    match err {
        BridgeError::BootstrapFailed { message } => assert_eq!(message, "Invalid passphrase"),
        other => panic!("expected BootstrapFailed, got {other:?}"),
    }

    let session = client.store().session().unwrap().unwrap();
    assert_eq!(session.secret(), "old-secret");
    assert_eq!(session.display_name, MANUAL_DISPLAY_NAME);
    assert_eq!(client.store().draft(), "5550001111");
}

#[tokio::test]
async fn bootstrap_error_without_json_falls_back_to_status() {
    let bridge = TestBridge::start().await;
    bridge
        .bootstrap_responds(ResponseTemplate::new(502).set_body_string("Bad Gateway"), 1)
        .await;

    let mut client = TestClient::new(&bridge.uri()).unwrap();
    let err = client.app.login_with_passphrase("pass").await.unwrap_err();
    match err {
        BridgeError::BootstrapFailed { message } => assert_eq!(message, "HTTP 502"),
        other => panic!("expected BootstrapFailed, got {other:?}"),
    }
    assert!(!client.store().has_session());
}

#[tokio::test]
async fn bootstrap_without_secret_is_rejected() {
    let bridge = TestBridge::start().await;
    bridge
        .bootstrap_responds(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "webhook_secret": "", "display_name": "Clinic" })),
            1,
        )
        .await;

    let mut client = TestClient::new(&bridge.uri()).unwrap();
    let err = client.app.login_with_passphrase("pass").await.unwrap_err();
    assert!(matches!(err, BridgeError::BootstrapFailed { .. }));
    assert!(!client.store().has_session());
}

#[tokio::test]
async fn unreachable_bridge_is_network_error() {
    let addr = closed_addr().await.unwrap();
    let mut client = TestClient::new(&format!("http://{addr}")).unwrap();

    let err = client.app.login_with_passphrase("pass").await.unwrap_err();
    assert!(matches!(err, BridgeError::Network { .. }), "got {err:?}");
    assert!(err.is_retryable());
    assert!(!client.store().has_session());
}

#[tokio::test]
async fn blank_passphrase_never_reaches_bridge() {
    let bridge = TestBridge::start().await;
    bridge.expect_no_requests().await;

    let mut client = TestClient::new(&bridge.uri()).unwrap();
    let err = client.app.login_with_passphrase("   ").await.unwrap_err();
    assert!(matches!(err, BridgeError::BootstrapFailed { .. }));
}

#[tokio::test]
async fn logout_then_reset() {
    let bridge = TestBridge::start().await;
    bridge.bootstrap_ok("s3cret", "Clinic", &[]).await;
    bridge.webhook_ok("s3cret", 1).await;

    let mut client = TestClient::new(&bridge.uri()).unwrap();
    client.app.login_with_passphrase("pass").await.unwrap();
    client.app.send("hello", "5551234567").await.unwrap();
    client.app.store_mut().set_draft("5551234567").unwrap();

    client.app.logout().unwrap();
    let mut client = client.reopen().unwrap();
    assert!(!client.store().has_session());
    assert_eq!(client.store().draft(), "5551234567");
    assert_eq!(client.history(), vec!["hello"]);

    client.app.reset().unwrap();
    let client = client.reopen().unwrap();
    assert_eq!(client.store().draft(), "");
    assert!(client.history().is_empty());
    assert_eq!(client.store().bridge_url(), None);
}
