use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::generation::GenerationPolicy;
use crate::lifecycle::UnassignedPolicy;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `chorewheel.json` and stored attachments.
    pub data_dir: PathBuf,
    /// Group used when a command does not name one.
    pub default_group: String,
    pub unassigned_policy: UnassignedPolicy,
}

impl Config {
    /// Builds config from environment variables (call `load_dotenv()` first).
    ///
    /// The data directory is determined in the following order:
    /// 1. `CHOREWHEEL_DB` environment variable.
    /// 2. `~/.local/share/chorewheel` (on Linux).
    /// 3. `./chorewheel` (fallback).
    pub fn from_env() -> Self {
        let data_dir = env_opt("CHOREWHEEL_DB").map(PathBuf::from).unwrap_or_else(|| {
            let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
            p.push("chorewheel");
            p
        });
        let unassigned_policy = match env_opt("CHOREWHEEL_UNASSIGNED").map(|v| v.parse::<UnassignedPolicy>()) {
            Some(Ok(policy)) => policy,
            Some(Err(e)) => {
                warn!("{}; falling back to 'accept'", e);
                UnassignedPolicy::Accept
            }
            None => UnassignedPolicy::Accept,
        };
        Config {
            data_dir,
            default_group: env_opt("CHOREWHEEL_GROUP").unwrap_or_else(|| "home".to_string()),
            unassigned_policy,
        }
    }

    /// Config rooted at `dir` with default settings.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: dir.into(),
            default_group: "home".to_string(),
            unassigned_policy: UnassignedPolicy::Accept,
        }
    }

    pub fn generation_policy(&self) -> GenerationPolicy {
        GenerationPolicy { unassigned: self.unassigned_policy }
    }
}
