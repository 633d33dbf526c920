//! Error types for the watch registry.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur in the watch registry.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The kernel refused to add a watch.
    #[error("inotify_add_watch({path}) failed: {source}")]
    AddWatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or removing a registry entry failed.
    #[error("registry entry {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The live registry directory could not be moved aside.
    #[error("unable to move watches dir '{path}': {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The displaced registry directory could not be read.
    #[error("unable to open old watches dir '{path}': {source}")]
    OpenPrevious {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed TOML configuration.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a best-effort registry operation.
///
/// Nothing in this crate is fatal to the host process. An operation either
/// did its work, hit a recoverable failure that has already been logged, or
/// was skipped because the channel is unavailable or the device is not
/// watchable.
#[derive(Debug)]
#[must_use]
pub enum Outcome<T = ()> {
    /// The operation completed.
    Done(T),

    /// The operation failed part way; the error has been logged.
    Degraded(WatchError),

    /// The operation did nothing.
    Skipped,
}

impl<T> Outcome<T> {
    /// Whether the operation completed.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Whether the operation was a silent no-op.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// The value of a completed operation.
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Degraded(_) | Self::Skipped => None,
        }
    }

    /// The logged error of a degraded operation.
    pub fn error(&self) -> Option<&WatchError> {
        match self {
            Self::Degraded(err) => Some(err),
            Self::Done(_) | Self::Skipped => None,
        }
    }
}
