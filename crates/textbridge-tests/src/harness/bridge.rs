use serde_json::{Value, json};
use std::time::Duration;
use textbridge::protocol::{BOOTSTRAP_PATH, SECRET_HEADER, WEBHOOK_PATH};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock SMS bridge serving `/bootstrap` and `/webhook`.
pub struct TestBridge {
    server: MockServer,
}

impl TestBridge {
    pub async fn start() -> Self {
        super::init_tracing();
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Answer bootstrap with a session for `secret`.
    pub async fn bootstrap_ok(&self, secret: &str, display_name: &str, recipients: &[&str]) {
        self.bootstrap_responds(
            ResponseTemplate::new(200).set_body_json(json!({
                "webhook_secret": secret,
                "display_name": display_name,
                "recipients": recipients,
            })),
            1,
        )
        .await;
    }

    pub async fn bootstrap_responds(&self, template: ResponseTemplate, times: u64) {
        Mock::given(method("POST"))
            .and(path(BOOTSTRAP_PATH))
            .respond_with(template)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Accept sends carrying `secret`, `times` times.
    pub async fn webhook_ok(&self, secret: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .and(header(SECRET_HEADER, secret))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn webhook_responds(&self, template: ResponseTemplate, times: u64) {
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(template)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Accept sends, but only after `delay`.
    pub async fn webhook_stalls(&self, delay: Duration) {
        self.webhook_responds(ResponseTemplate::new(200).set_delay(delay), 1)
            .await;
    }

    /// Fail the test if any request reaches the bridge.
    pub async fn expect_no_requests(&self) {
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of every request received on `/webhook`, in arrival order.
    pub async fn webhook_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == WEBHOOK_PATH)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
