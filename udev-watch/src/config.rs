//! Configuration for the watch registry.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};

/// Location of the live registry, relative to the device tree root.
const WATCH_DIR: &str = ".udev/watch";

/// Location of the displaced registry during restore.
const PREVIOUS_WATCH_DIR: &str = ".udev/watch.old";

/// Filesystem roots the registry works under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Root of the device node tree.
    pub dev_root: PathBuf,

    /// Root of the sysfs tree that identity paths live in.
    pub sys_root: PathBuf,
}

impl WatchConfig {
    /// Create a config rooted at the given device tree.
    pub fn new(dev_root: impl Into<PathBuf>) -> Self {
        Self {
            dev_root: dev_root.into(),
            ..Self::default()
        }
    }

    /// Set the sysfs root.
    pub fn with_sys_root(mut self, sys_root: impl Into<PathBuf>) -> Self {
        self.sys_root = sys_root.into();
        self
    }

    /// Load a config from a TOML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse a config from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        if config.dev_root.as_os_str().is_empty() {
            return Err(WatchError::Config("dev_root must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Directory holding the live registry entries.
    pub fn watch_dir(&self) -> PathBuf {
        self.dev_root.join(WATCH_DIR)
    }

    /// Directory the previous registry is moved to while it is replayed.
    pub fn previous_watch_dir(&self) -> PathBuf {
        self.dev_root.join(PREVIOUS_WATCH_DIR)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dev_root: PathBuf::from("/dev"),
            sys_root: PathBuf::from("/sys"),
        }
    }
}
