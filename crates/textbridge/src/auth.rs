use crate::client::BridgeClient;
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::{BootstrapResponse, ErrorBody};
use crate::session::{Session, SessionStore};
use crate::store::KeyValueStore;

/// Exchange a passphrase for a session via `POST /bootstrap`.
///
/// On success the new session replaces any existing one and the saved
/// draft is cleared, so recipients typed for one service never leak into
/// another. On any failure the stored state is left untouched.
pub async fn login_with_passphrase<S: KeyValueStore>(
    client: &BridgeClient,
    store: &mut SessionStore<S>,
    passphrase: &str,
) -> BridgeResult<Session> {
    if passphrase.trim().is_empty() {
        return Err(BridgeError::BootstrapFailed {
            message: "passphrase is empty".to_string(),
        });
    }

    let reply = client.bootstrap(passphrase).await?;
    if !reply.status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&reply.body)
            .ok()
            .map(|b| b.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {}", reply.status.as_u16()));
        tracing::warn!(status = reply.status.as_u16(), "bootstrap rejected");
        return Err(BridgeError::BootstrapFailed { message });
    }

    let resp: BootstrapResponse =
        serde_json::from_str(&reply.body).map_err(|e| BridgeError::BootstrapFailed {
            message: format!("unexpected bootstrap response: {e}"),
        })?;
    if resp.webhook_secret.trim().is_empty() {
        return Err(BridgeError::BootstrapFailed {
            message: "bridge returned an empty secret".to_string(),
        });
    }

    let session = Session::new(resp.webhook_secret, resp.display_name, resp.recipients);
    store.install_session(&session)?;
    store.clear_draft()?;
    tracing::info!(
        display_name = %session.display_name,
        defaults = session.default_recipients.len(),
        "session installed from passphrase"
    );
    Ok(session)
}

/// Install a session from a secret entered by hand. No network round-trip.
pub fn login_with_secret<S: KeyValueStore>(
    store: &mut SessionStore<S>,
    secret: &str,
) -> BridgeResult<Session> {
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(BridgeError::ConfigurationMissing);
    }
    let session = Session::manual(secret);
    store.install_session(&session)?;
    tracing::info!("session installed from manual secret");
    Ok(session)
}

/// Forget the session. Draft, history and bridge URL are kept.
pub fn logout<S: KeyValueStore>(store: &mut SessionStore<S>) -> BridgeResult<()> {
    store.clear_session()?;
    tracing::info!("session cleared");
    Ok(())
}

/// Forget everything the client has stored.
pub fn reset<S: KeyValueStore>(store: &mut SessionStore<S>) -> BridgeResult<()> {
    store.reset()?;
    tracing::info!("all stored state cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MANUAL_DISPLAY_NAME;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn store() -> SessionStore<MemoryStore> {
        SessionStore::new(MemoryStore::new())
    }

    #[test]
    fn manual_login_installs_placeholder_session() {
        let mut store = store();
        store.set_draft("5551234567").unwrap();
        let session = login_with_secret(&mut store, "  abc123 ").unwrap();
        assert_eq!(session.secret(), "abc123");
        assert_eq!(session.display_name, MANUAL_DISPLAY_NAME);
        assert!(session.default_recipients.is_empty());
        assert_eq!(store.session().unwrap(), Some(session));
        // Manual login leaves the draft alone.
        assert_eq!(store.draft(), "5551234567");
    }

    #[test]
    fn manual_login_rejects_blank_secret() {
        let mut store = store();
        store.install_session(&Session::manual("old")).unwrap();
        assert!(matches!(
            login_with_secret(&mut store, "   "),
            Err(BridgeError::ConfigurationMissing)
        ));
        assert_eq!(store.session().unwrap().unwrap().secret(), "old");
    }

    #[test]
    fn logout_keeps_draft_and_history() {
        let mut store = store();
        login_with_secret(&mut store, "abc").unwrap();
        store.set_draft("5551234567").unwrap();
        store.record_history("hello").unwrap();
        logout(&mut store).unwrap();
        assert!(!store.has_session());
        assert_eq!(store.draft(), "5551234567");
        assert_eq!(store.history().unwrap().len(), 1);
    }

    #[test]
    fn reset_clears_draft_and_history() {
        let mut store = store();
        login_with_secret(&mut store, "abc").unwrap();
        store.set_draft("5551234567").unwrap();
        store.record_history("hello").unwrap();
        reset(&mut store).unwrap();
        assert!(!store.has_session());
        assert_eq!(store.draft(), "");
        assert!(store.history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_passphrase_fails_without_network() {
        // Nothing listens on this port; a network call would yield Network.
        let client = BridgeClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let mut store = store();
        let err = login_with_passphrase(&client, &mut store, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::BootstrapFailed { .. }));
    }
}
