//! Handler layer that front ends call.
//!
//! Each method takes typed input, runs one operation against the session
//! store and the bridge, records the user-visible outcome in the activity
//! log, and returns a typed result.

use crate::activity::ActivityLog;
use crate::auth;
use crate::client::BridgeClient;
use crate::config::BridgeConfig;
use crate::dispatch::{self, SendReport};
use crate::error::{BridgeError, BridgeResult};
use crate::history::History;
use crate::recipient::split_recipient_tokens;
use crate::session::{Session, SessionStore};
use crate::store::KeyValueStore;
use serde::Serialize;

/// Snapshot of stored state for display.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub bridge_url: Option<String>,
    pub logged_in: bool,
    pub display_name: Option<String>,
    pub default_recipients: Vec<String>,
    pub draft: String,
    pub history_len: usize,
}

pub struct BridgeApp<S> {
    client: Option<BridgeClient>,
    store: SessionStore<S>,
    activity: ActivityLog,
}

impl<S: KeyValueStore> BridgeApp<S> {
    /// Build from resolved configuration. A missing bridge URL is allowed
    /// here; only operations that need the network will fail.
    pub fn new(config: &BridgeConfig, store: SessionStore<S>) -> BridgeResult<Self> {
        let client = match config.bridge_url {
            Some(_) => Some(BridgeClient::from_config(config)?),
            None => None,
        };
        Ok(Self {
            client,
            store,
            activity: ActivityLog::new(),
        })
    }

    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SessionStore<S> {
        &mut self.store
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn activity_mut(&mut self) -> &mut ActivityLog {
        &mut self.activity
    }

    fn client(&self) -> BridgeResult<&BridgeClient> {
        self.client.as_ref().ok_or(BridgeError::ConfigurationMissing)
    }

    pub fn status(&self) -> BridgeResult<Status> {
        let session = self.store.session()?;
        Ok(Status {
            bridge_url: self.client.as_ref().map(|c| c.base_url().to_string()),
            logged_in: session.is_some(),
            display_name: session.as_ref().map(|s| s.display_name.clone()),
            default_recipients: session.map(|s| s.default_recipients).unwrap_or_default(),
            draft: self.store.draft(),
            history_len: self.store.history()?.len(),
        })
    }

    pub async fn login_with_passphrase(&mut self, passphrase: &str) -> BridgeResult<Session> {
        let client = match self.client() {
            Ok(c) => c.clone(),
            Err(e) => {
                self.activity.error("No bridge URL configured.");
                return Err(e);
            }
        };
        match auth::login_with_passphrase(&client, &mut self.store, passphrase).await {
            Ok(session) => {
                self.activity.success(format!(
                    "Logged in as {} ({} default recipients).",
                    session.display_name,
                    session.default_recipients.len()
                ));
                self.remember_bridge_url(client.base_url());
                Ok(session)
            }
            Err(e) => {
                self.activity.error(e.to_string());
                Err(e)
            }
        }
    }

    pub fn login_with_secret(&mut self, secret: &str) -> BridgeResult<Session> {
        match auth::login_with_secret(&mut self.store, secret) {
            Ok(session) => {
                self.activity.success("Configuration saved.");
                if let Some(url) = self.client.as_ref().map(|c| c.base_url().to_string()) {
                    self.remember_bridge_url(&url);
                }
                Ok(session)
            }
            Err(e) => {
                self.activity.error(e.to_string());
                Err(e)
            }
        }
    }

    /// Save the URL a session was issued by. The session is already
    /// installed, so a failure here is only reported.
    fn remember_bridge_url(&mut self, url: &str) {
        if let Err(e) = self.store.set_bridge_url(url) {
            tracing::warn!(error = %e, "failed to save bridge URL");
            self.activity
                .warning(format!("Logged in, but the bridge URL was not saved: {e:#}"));
        }
    }

    pub fn logout(&mut self) -> BridgeResult<()> {
        auth::logout(&mut self.store)?;
        self.activity.info("Logged out. Draft and history kept.");
        Ok(())
    }

    pub fn reset(&mut self) -> BridgeResult<()> {
        auth::reset(&mut self.store)?;
        self.activity.clear();
        self.activity.info("All stored state cleared.");
        Ok(())
    }

    pub fn history(&self) -> BridgeResult<History> {
        Ok(self.store.history()?)
    }

    /// Send a message to the session defaults plus `additional` recipients.
    pub async fn send(&mut self, message: &str, additional: &str) -> BridgeResult<SendReport> {
        let client = match self.client() {
            Ok(c) => c.clone(),
            Err(e) => {
                self.activity.error("No bridge URL configured.");
                return Err(e);
            }
        };
        let prepared = match dispatch::prepare(&self.store, message, additional) {
            Ok(p) => p,
            Err(e) => {
                self.log_send_failure(&e);
                return Err(e);
            }
        };

        for rejected in &prepared.resolution.rejected {
            self.activity
                .warning(format!("Skipped invalid recipient {rejected}."));
        }
        if split_recipient_tokens(additional).next().is_none() {
            self.activity
                .info("No extra recipients entered. Using default recipients.");
        }
        let targets: Vec<&str> = prepared
            .resolution
            .recipients
            .iter()
            .map(|r| r.as_str())
            .collect();
        self.activity
            .info(format!("Sending to [{}]...", targets.join(", ")));

        match dispatch::deliver(&client, &mut self.store, message, prepared).await {
            Ok(report) => {
                self.activity
                    .success(format!("Message sent to {} recipients.", report.sent_count()));
                if let Some(e) = &report.history_error {
                    self.activity
                        .warning(format!("Message sent, but history was not saved: {e}"));
                }
                Ok(report)
            }
            Err(e) => {
                self.log_send_failure(&e);
                Err(e)
            }
        }
    }

    /// Re-send the `index`-th most recent message (0 = newest).
    pub async fn resend(&mut self, index: usize, additional: &str) -> BridgeResult<SendReport> {
        let history = self.store.history()?;
        let Some(message) = history.get(index) else {
            self.activity.error(format!("No history entry #{index}."));
            return Err(anyhow::anyhow!("no history entry #{index}").into());
        };
        let message = message.to_string();
        self.send(&message, additional).await
    }

    fn log_send_failure(&mut self, err: &BridgeError) {
        match err {
            BridgeError::NoValidRecipients { rejected } => {
                for r in rejected {
                    self.activity.warning(format!("Invalid recipient {r}."));
                }
                self.activity
                    .error("No recipients specified and no defaults configured.");
            }
            BridgeError::AuthenticationRejected { .. } => {
                self.activity
                    .error(format!("{err}. Log in again to get a new secret."));
            }
            BridgeError::Network { .. } => {
                self.activity
                    .error(format!("{err}. Check the bridge URL and try again."));
            }
            _ => self.activity.error(err.to_string()),
        }
    }
}
