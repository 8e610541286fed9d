use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STAGING_DIR: &str = "/tmp";

/// Runtime configuration for the update receiver.
///
/// Loaded from an optional YAML file named by the `OTALINK_CONFIG`
/// environment variable, with `LISTEN` and `STAGING_DIR` overriding
/// individual fields. Loading never fails; a broken config file is
/// logged and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the update listener binds, e.g. "0.0.0.0:8080"
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory holding the pending artifact before it is verified
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STAGING_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            staging_dir: default_staging_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let mut cfg = std::env::var("OTALINK_CONFIG")
            .ok()
            .and_then(|path| Self::from_file(&path))
            .unwrap_or_default();

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.listen_addr = addr;
        }
        if let Ok(dir) = std::env::var("STAGING_DIR") {
            cfg.staging_dir = PathBuf::from(dir);
        }

        cfg
    }

    fn from_file(path: &str) -> Option<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("cannot read config file {}: {}", path, e);
                return None;
            }
        };

        match serde_yaml::from_str(&text) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                tracing::warn!("ignoring config file {}: {}", path, e);
                None
            }
        }
    }
}
