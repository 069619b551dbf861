use crate::recipient::Rejected;
use thiserror::Error;

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Every failure a bridge operation can report back to the caller.
///
/// None of these are fatal: the caller shows the message and waits for the
/// user to act again. Nothing is retried automatically.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no session configured; log in first")]
    ConfigurationMissing,
    #[error("message is empty")]
    EmptyMessage,
    #[error("no valid recipients ({} rejected)", rejected.len())]
    NoValidRecipients { rejected: Vec<Rejected> },
    #[error("bridge rejected the session secret (HTTP {status})")]
    AuthenticationRejected { status: u16 },
    #[error("bridge error (HTTP {status}): {body}")]
    Server { status: u16, body: String },
    #[error("network error: {message}")]
    Network { message: String },
    #[error("login failed: {message}")]
    BootstrapFailed { message: String },
    #[error(transparent)]
    Local(#[from] anyhow::Error),
}

impl BridgeError {
    /// A rejected secret can never succeed again without a new login.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::AuthenticationRejected { .. })
    }

    /// Whether repeating the same action unchanged might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Server { status: 500.., .. })
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("could not reach bridge: {err}")
        } else {
            err.to_string()
        };
        Self::Network { message }
    }
}
