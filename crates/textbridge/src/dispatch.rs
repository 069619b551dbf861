use crate::client::BridgeClient;
use crate::error::{BridgeError, BridgeResult};
use crate::history::History;
use crate::protocol::WebhookRequest;
use crate::recipient::{NormalizedRecipient, Rejected, Resolution, resolve};
use crate::session::SessionStore;
use crate::store::KeyValueStore;
use serde::Serialize;
use zeroize::Zeroizing;

/// Outcome of a successful send.
#[derive(Debug, Clone, Serialize)]
pub struct SendReport {
    pub recipients: Vec<NormalizedRecipient>,
    /// User tokens that were skipped. The send still went out.
    pub rejected: Vec<Rejected>,
    /// Set when the message went out but could not be saved to history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_error: Option<String>,
}

impl SendReport {
    pub fn sent_count(&self) -> usize {
        self.recipients.len()
    }
}

/// A send that passed every local check and is ready to go out.
pub struct PreparedSend {
    pub secret: Zeroizing<String>,
    pub resolution: Resolution,
    history: History,
}

impl std::fmt::Debug for PreparedSend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedSend")
            .field("secret", &"<redacted>")
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

/// Check everything that can be checked without the network.
///
/// Stored history is parsed here too, so a store that cannot take the
/// history update fails before anything is delivered.
pub fn prepare<S: KeyValueStore>(
    store: &SessionStore<S>,
    message: &str,
    additional: &str,
) -> BridgeResult<PreparedSend> {
    let session = store.session()?.ok_or(BridgeError::ConfigurationMissing)?;
    if message.trim().is_empty() {
        return Err(BridgeError::EmptyMessage);
    }
    let resolution = resolve(&session.default_recipients, additional)?;
    let history = store.history()?;
    Ok(PreparedSend {
        secret: Zeroizing::new(session.secret().to_string()),
        resolution,
        history,
    })
}

/// Deliver a prepared send.
///
/// Exactly one request is made. The store is borrowed mutably for the whole
/// call, so a second send cannot start until this one finishes. Once the
/// bridge accepts the message the send counts as done: a failed history
/// write is reported in [`SendReport::history_error`], never as an error.
pub async fn deliver<S: KeyValueStore>(
    client: &BridgeClient,
    store: &mut SessionStore<S>,
    message: &str,
    prepared: PreparedSend,
) -> BridgeResult<SendReport> {
    let PreparedSend {
        secret,
        resolution,
        mut history,
    } = prepared;
    let request = WebhookRequest {
        message: message.to_string(),
        to: resolution.to_field(),
    };

    tracing::info!(recipients = resolution.len(), "sending message");
    let reply = client.webhook(&secret, &request).await?;
    if !reply.status.is_success() {
        let status = reply.status.as_u16();
        if matches!(status, 401 | 403) {
            tracing::warn!(status, "bridge rejected session secret");
            return Err(BridgeError::AuthenticationRejected { status });
        }
        tracing::warn!(status, "bridge refused message");
        return Err(BridgeError::Server {
            status,
            body: reply.body,
        });
    }

    history.record(message);
    let history_error = match store.save_history(&history) {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(error = %e, "message sent but history not saved");
            Some(format!("{e:#}"))
        }
    };
    Ok(SendReport {
        recipients: resolution.recipients,
        rejected: resolution.rejected,
        history_error,
    })
}

/// Send `message` to the session defaults plus `additional` recipients.
///
/// Every local precondition is checked before the single request goes out.
/// On failure nothing is changed.
pub async fn send_message<S: KeyValueStore>(
    client: &BridgeClient,
    store: &mut SessionStore<S>,
    message: &str,
    additional: &str,
) -> BridgeResult<SendReport> {
    let prepared = prepare(store, message, additional)?;
    deliver(client, store, message, prepared).await
}
