use crate::history::History;
use crate::store::{KeyValueStore, StoreKey};
use anyhow::{Context, Result};
use std::fmt;
use zeroize::Zeroizing;

/// Display name given to sessions created from a directly entered secret.
pub const MANUAL_DISPLAY_NAME: &str = "Manual Configuration";

/// Authenticated state granting permission to send.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Credential sent as `X-Secret`. Wiped from memory when dropped.
    secret: Zeroizing<String>,
    pub display_name: String,
    /// Service-provided recipients merged into every send.
    pub default_recipients: Vec<String>,
}

impl Session {
    pub fn new(
        secret: impl Into<String>,
        display_name: impl Into<String>,
        default_recipients: Vec<String>,
    ) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            display_name: display_name.into(),
            default_recipients,
        }
    }

    /// Session for a secret entered by hand: placeholder name, no defaults.
    pub fn manual(secret: impl Into<String>) -> Self {
        Self::new(secret, MANUAL_DISPLAY_NAME, Vec::new())
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("secret", &"<redacted>")
            .field("display_name", &self.display_name)
            .field("default_recipients", &self.default_recipients)
            .finish()
    }
}

/// Typed view over the raw key/value store.
///
/// A session exists exactly when a secret is stored. Draft, history and the
/// bridge URL live independently of it and survive logout.
pub struct SessionStore<S> {
    inner: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    // -- Session --

    pub fn session(&self) -> Result<Option<Session>> {
        let Some(secret) = self.inner.get(StoreKey::Secret).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let display_name = self.inner.get(StoreKey::DisplayName).unwrap_or_default();
        let default_recipients = match self.inner.get(StoreKey::DefaultRecipients) {
            Some(raw) if !raw.is_empty() => {
                serde_json::from_str(&raw).context("invalid stored default recipients")?
            }
            _ => Vec::new(),
        };
        Ok(Some(Session::new(secret, display_name, default_recipients)))
    }

    pub fn has_session(&self) -> bool {
        self.inner
            .get(StoreKey::Secret)
            .is_some_and(|s| !s.is_empty())
    }

    /// Replace any existing session.
    pub fn install_session(&mut self, session: &Session) -> Result<()> {
        let defaults = serde_json::to_string(&session.default_recipients)?;
        self.inner
            .set(StoreKey::DisplayName, session.display_name.clone())?;
        self.inner.set(StoreKey::DefaultRecipients, defaults)?;
        self.inner
            .set(StoreKey::Secret, session.secret().to_string())
    }

    /// Drop the session fields only.
    pub fn clear_session(&mut self) -> Result<()> {
        for key in StoreKey::SESSION {
            self.inner.delete(key)?;
        }
        Ok(())
    }

    // -- Draft --

    pub fn draft(&self) -> String {
        self.inner.get(StoreKey::Draft).unwrap_or_default()
    }

    pub fn set_draft(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return self.clear_draft();
        }
        self.inner.set(StoreKey::Draft, text.to_string())
    }

    pub fn clear_draft(&mut self) -> Result<()> {
        self.inner.delete(StoreKey::Draft)
    }

    // -- History --

    pub fn history(&self) -> Result<History> {
        match self.inner.get(StoreKey::History) {
            Some(raw) if !raw.is_empty() => {
                let entries: Vec<String> =
                    serde_json::from_str(&raw).context("invalid stored history")?;
                Ok(History::from_entries(entries))
            }
            _ => Ok(History::new()),
        }
    }

    /// Record a sent message and persist the updated history.
    pub fn record_history(&mut self, message: &str) -> Result<History> {
        let mut history = self.history()?;
        history.record(message);
        self.save_history(&history)?;
        Ok(history)
    }

    pub fn save_history(&mut self, history: &History) -> Result<()> {
        self.inner
            .set(StoreKey::History, serde_json::to_string(&history.to_vec())?)
    }

    // -- Bridge URL --

    pub fn bridge_url(&self) -> Option<String> {
        self.inner.get(StoreKey::BridgeUrl).filter(|u| !u.is_empty())
    }

    pub fn set_bridge_url(&mut self, url: &str) -> Result<()> {
        self.inner.set(StoreKey::BridgeUrl, url.to_string())
    }

    /// Forget everything: session, draft, history and bridge URL.
    pub fn reset(&mut self) -> Result<()> {
        for key in StoreKey::ALL {
            self.inner.delete(key)?;
        }
        Ok(())
    }
}
