//! Server configuration from the environment.
use std::path::PathBuf;

use inspect_agents::DEFAULT_MODEL;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_DB_PATH: &str = "inspections.db";
pub const DEFAULT_UPLOAD_DIR: &str = "data/stream";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listen address (`INSPECT_ADDR`)
    pub addr: String,
    /// SQLite file (`INSPECT_DB_PATH`), `:memory:` for a throwaway store
    pub db_path: String,
    /// `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`
    pub api_key: Option<String>,
    /// `INSPECT_MODEL`
    pub model: String,
    /// Export templates override (`INSPECT_TEMPLATES`)
    pub templates_path: Option<String>,
    /// Where uploaded camera frames land (`INSPECT_UPLOAD_DIR`)
    pub upload_dir: PathBuf,
    /// Agent sessions unused this long are dropped (`INSPECT_SESSION_IDLE_SECS`)
    pub session_idle_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            db_path: DEFAULT_DB_PATH.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            templates_path: None,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            addr: get("INSPECT_ADDR").unwrap_or(defaults.addr),
            db_path: get("INSPECT_DB_PATH").unwrap_or(defaults.db_path),
            api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
            model: get("INSPECT_MODEL").unwrap_or(defaults.model),
            templates_path: get("INSPECT_TEMPLATES"),
            upload_dir: get("INSPECT_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            session_idle_secs: get("INSPECT_SESSION_IDLE_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.session_idle_secs),
        }
    }
}
