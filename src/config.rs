//! Configuration for learnstack.
//!
//! Settings are layered: `learnstack.toml`, then environment variables
//! (including a `.env` file loaded at startup), then command-line flags.
//! Every field has a default, so an empty or missing file is valid.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//! db_path = ".learnstack/learnstack.db"
//! dev = false
//!
//! [ai]
//! base_url = "http://localhost:8000"
//! timeout_secs = 120
//!
//! [client]
//! api_url = "http://localhost:3000"
//! token = "..."
//! data_dir = "/home/me/.local/share/learnstack"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::server::app::ServerConfig;

/// Name of the config file looked up in the working directory.
pub const FILE_NAME: &str = "learnstack.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Permissive CORS and bind on all interfaces.
    #[serde(default)]
    pub dev: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".learnstack/learnstack.db")
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            dev: false,
        }
    }
}

/// The external AI service the server delegates to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSection {
    #[serde(default = "default_ai_url")]
    pub base_url: String,
    /// Request timeout; no timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_ai_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            base_url: default_ai_url(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Session token sent as the `access_token` cookie.
    #[serde(default)]
    pub token: Option<String>,
    /// Where the draft form is kept. Defaults to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            data_dir: None,
            timeout_secs: None,
        }
    }
}

/// Root of `learnstack.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnstackConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub client: ClientSection,
}

impl LearnstackConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse learnstack.toml")
    }

    /// Load from `path`, which must exist, or from `learnstack.toml` in the
    /// working directory when present. Falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let local = PathBuf::from(FILE_NAME);
                if !local.exists() {
                    return Ok(Self::default());
                }
                local
            }
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("LEARNSTACK_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid LEARNSTACK_PORT '{port}'"))?;
        }
        if let Some(path) = get("LEARNSTACK_DB_PATH") {
            self.server.db_path = PathBuf::from(path);
        }
        if let Some(url) = get("PYTHON_API_URL") {
            self.ai.base_url = url;
        }
        if let Some(url) = get("LEARNSTACK_API_URL") {
            self.client.api_url = url;
        }
        if let Some(token) = get("LEARNSTACK_TOKEN") {
            self.client.token = Some(token);
        }
        if let Some(dir) = get("LEARNSTACK_DATA_DIR") {
            self.client.data_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            db_path: self.server.db_path.clone(),
            ai_base_url: self.ai.base_url.clone(),
            ai_timeout: self.ai.timeout_secs.map(Duration::from_secs),
            dev_mode: self.server.dev,
            open_browser: false,
        }
    }

    pub fn client_timeout(&self) -> Option<Duration> {
        self.client.timeout_secs.map(Duration::from_secs)
    }

    /// Directory holding the client's local storage file.
    pub fn client_data_dir(&self) -> PathBuf {
        self.client
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("learnstack")))
            .unwrap_or_else(|| PathBuf::from(".learnstack"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize learnstack.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}
