//! Configuration
//!
//! Settings are layered, later layers overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. a TOML file (`scriptdev.toml` unless a path is given)
//! 3. environment variables prefixed `SCRIPTDEV_` (e.g. `SCRIPTDEV_NUM_THREADS=4`)
//!
//! Command-line flags are applied on top by the binary.

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use scriptdev_runtime::SessionOptions;
use scriptdev_scheduler::SchedulerOptions;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "scriptdev.toml";

/// Prefix of environment variables read into the configuration
pub const ENV_PREFIX: &str = "SCRIPTDEV_";

/// Worker-pool size used when none, or a value below one, is configured
pub const DEFAULT_NUM_THREADS: usize = 3;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptDevConfig {
    /// Worker threads executing scripts. Values below 1 select the default.
    pub num_threads: i64,
    /// Surface script diagnostics at WARN level
    pub debug: bool,
    /// Idle wait of a worker on the task queue, in milliseconds
    pub poll_interval_ms: u64,
    /// Wait slice for the session lock, in milliseconds
    pub lock_wait_ms: u64,
}

impl Default for ScriptDevConfig {
    fn default() -> Self {
        Self {
            num_threads: DEFAULT_NUM_THREADS as i64,
            debug: false,
            poll_interval_ms: 1000,
            lock_wait_ms: 100,
        }
    }
}

impl ScriptDevConfig {
    /// The layered provider chain for `path` (or the default file).
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the configuration.
    ///
    /// The default file is optional; an explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        if let Some(path) = path {
            if !path.is_file() {
                return Err(figment::Error::from(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
        }

        let config: Self = Self::figment(path).extract()?;
        tracing::debug!("[config] Loaded {:?}", config);
        Ok(config)
    }

    /// Effective worker-pool size
    pub fn worker_threads(&self) -> usize {
        if self.num_threads < 1 {
            DEFAULT_NUM_THREADS
        } else {
            self.num_threads as usize
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms.max(1))
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            poll_interval: self.poll_interval(),
            ..Default::default()
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            lock_wait: self.lock_wait(),
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
