//! Wire types for the bridge's JSON-over-HTTPS endpoints.

use serde::{Deserialize, Serialize};

/// Path of the passphrase exchange endpoint, relative to the bridge base URL.
pub const BOOTSTRAP_PATH: &str = "/bootstrap";
/// Path of the send endpoint, relative to the bridge base URL.
pub const WEBHOOK_PATH: &str = "/webhook";
/// Header carrying the session secret on send requests.
pub const SECRET_HEADER: &str = "X-Secret";

/// `POST /bootstrap` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapRequest {
    pub passphrase: String,
}

/// `POST /bootstrap` success body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapResponse {
    pub webhook_secret: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Error body returned by `/bootstrap` on a non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

/// `POST /webhook` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookRequest {
    pub message: String,
    /// Comma-joined normalized recipients.
    pub to: String,
}
