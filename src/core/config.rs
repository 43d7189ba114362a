use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::{P2PError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier this peer registers under.
    pub node_id: String,
    /// Address the listener binds and advertises.
    pub listen_ip: String,
    /// First port tried by the port allocator.
    pub base_port: u16,
    pub tracker_addr: String,
    /// Files announced on start, in tracker list format (`"/a, /b"`).
    pub shared_files: Option<String>,
    pub download_dir: PathBuf,
    pub response_timeout_ms: u64,
    /// Bound on how long an inbound connection may take to send its request; 0 disables it.
    pub request_timeout_ms: u64,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: format!("peer-{}", uuid::Uuid::new_v4().simple()),
            listen_ip: "127.0.0.1".to_string(),
            base_port: 4040,
            tracker_addr: "127.0.0.1:4000".to_string(),
            shared_files: None,
            download_dir: PathBuf::from("./downloads"),
            response_timeout_ms: 5000,
            request_timeout_ms: 30_000,
            chunk_size: 1024,
        }
    }
}

impl Config {
    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            P2PError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            P2PError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.is_empty() {
            return Err(P2PError::ConfigError("node_id cannot be empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(P2PError::ConfigError("chunk_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}
