use anyhow::Result;
use tempfile::TempDir;
use textbridge::app::BridgeApp;
use textbridge::config::BridgeConfig;
use textbridge::session::SessionStore;
use textbridge::store::FileStore;

/// A client app backed by a file store in a temporary state directory.
pub struct TestClient {
    pub app: BridgeApp<FileStore>,
    config: BridgeConfig,
    state_dir: TempDir,
}

impl TestClient {
    /// Client pointed at `bridge_url` with the default timeout.
    pub fn new(bridge_url: &str) -> Result<Self> {
        Self::with_timeout(bridge_url, 30)
    }

    pub fn with_timeout(bridge_url: &str, timeout_secs: u64) -> Result<Self> {
        let config = BridgeConfig {
            bridge_url: Some(bridge_url.to_string()),
            timeout_secs,
        };
        let state_dir = tempfile::tempdir()?;
        let store = SessionStore::new(FileStore::load(state_dir.path())?);
        let app = BridgeApp::new(&config, store)?;
        Ok(Self {
            app,
            config,
            state_dir,
        })
    }

    /// Re-read the store from disk, as a fresh process would.
    pub fn reopen(self) -> Result<Self> {
        let Self {
            app,
            config,
            state_dir,
        } = self;
        drop(app);
        let store = SessionStore::new(FileStore::load(state_dir.path())?);
        let app = BridgeApp::new(&config, store)?;
        Ok(Self {
            app,
            config,
            state_dir,
        })
    }

    pub fn store(&self) -> &SessionStore<FileStore> {
        self.app.store()
    }

    pub fn history(&self) -> Vec<String> {
        self.app
            .history()
            .map(|h| h.to_vec())
            .unwrap_or_default()
    }
}
