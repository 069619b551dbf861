use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the bridge base URL.
pub const BRIDGE_URL_ENV: &str = "TEXTBRIDGE_URL";
/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "TEXTBRIDGE_STATE_DIR";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Base URL of the bridge, without the endpoint path.
    #[serde(default)]
    pub bridge_url: Option<String>,
    /// Per-request timeout. Applies to both bootstrap and send.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BridgeConfig {
    /// Load from the default config file, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Self =
            toml::from_str(&contents).with_context(|| format!("invalid {}", path.display()))?;
        if let Some(url) = config.bridge_url.take() {
            config.bridge_url = Some(normalize_bridge_url(&url)?);
        }
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Apply the first available override, highest precedence first.
    ///
    /// Order: explicit flag, then `$TEXTBRIDGE_URL`, then the URL remembered
    /// in the session store. The config file value is the fallback.
    pub fn with_overrides(
        mut self,
        flag: Option<&str>,
        env: Option<&str>,
        stored: Option<&str>,
    ) -> Result<Self> {
        let chosen = [flag, env, stored]
            .into_iter()
            .flatten()
            .find(|u| !u.trim().is_empty());
        if let Some(url) = chosen {
            self.bridge_url = Some(normalize_bridge_url(url)?);
        }
        Ok(self)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bridge_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Trim whitespace and trailing slashes; require an http(s) scheme.
pub fn normalize_bridge_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    let Some((scheme, rest)) = url.split_once("://") else {
        bail!("bridge URL must start with http:// or https://: {url}");
    };
    if rest.is_empty() {
        bail!("bridge URL has no host: {url}");
    }
    match scheme.to_ascii_lowercase().as_str() {
        "https" => {}
        "http" => {
            tracing::warn!(url, "bridge URL is plain HTTP; the session secret is sent unencrypted");
        }
        _ => bail!("bridge URL must start with http:// or https://: {url}"),
    }
    Ok(url.to_string())
}

/// Where the session store lives: `$TEXTBRIDGE_STATE_DIR`, else
/// `~/.local/state/textbridge`.
pub fn default_state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME env var not set")?;
    Ok(PathBuf::from(home).join(".local/state/textbridge"))
}

/// Create the state directory if needed and restrict it to the owner.
pub fn ensure_state_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create state dir {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("failed to restrict {}", path.display()))?;
    }
    Ok(())
}

fn config_dir() -> PathBuf {
    if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(config_dir).join("textbridge")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("textbridge")
    } else {
        PathBuf::from("/tmp/textbridge")
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
