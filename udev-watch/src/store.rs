//! Durable storage for registry entries.
//!
//! Each entry is a symlink named by the decimal descriptor whose target is
//! the device's identity path, so that existence and value can be read with
//! one `readlink` and an entry is removed with one `unlink`.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::descriptor::is_descriptor_key;

/// Key-value store mapping descriptor keys to identity paths.
///
/// Keys are the registry's entry names; see
/// [`WatchDescriptor::to_key`](crate::WatchDescriptor::to_key).
pub trait WatchStore: Sized {
    /// Record `identity` under `key`, replacing any stale entry.
    fn put(&mut self, key: &str, identity: &str) -> io::Result<()>;

    /// The identity recorded under `key`, if any.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Remove `key`. Returns whether an entry existed.
    fn delete(&mut self, key: &str) -> io::Result<bool>;

    /// Every key that starts with a digit.
    fn keys(&self) -> io::Result<Vec<String>>;

    /// Move the whole store aside and return a handle to the moved copy.
    ///
    /// Returns `None` when there is nothing to move.
    fn displace(&mut self) -> io::Result<Option<Self>>;

    /// Remove a drained store.
    fn discard(self) -> io::Result<()>;

    /// Where the store lives, for diagnostics.
    fn location(&self) -> PathBuf;
}

/// A directory of symlinks.
#[derive(Debug, Clone)]
pub struct FsWatchStore {
    dir: PathBuf,
    previous_dir: PathBuf,
}

impl FsWatchStore {
    /// A store in `dir` that displaces itself to `previous_dir`.
    pub fn new(dir: impl Into<PathBuf>, previous_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            previous_dir: previous_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl WatchStore for FsWatchStore {
    fn put(&mut self, key: &str, identity: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => debug!("replaced stale watch entry '{}'", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        symlink(identity, &path)
    }

    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_link(self.entry_path(key)) {
            Ok(target) => {
                let target = target.to_string_lossy().into_owned();
                Ok((!target.is_empty()).then_some(target))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn delete(&mut self, key: &str) -> io::Result<bool> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if is_descriptor_key(&name) {
                keys.push(name);
            }
        }
        Ok(keys)
    }

    fn displace(&mut self) -> io::Result<Option<Self>> {
        match fs::rename(&self.dir, &self.previous_dir) {
            Ok(()) => Ok(Some(Self::new(
                self.previous_dir.clone(),
                self.previous_dir.clone(),
            ))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn discard(self) -> io::Result<()> {
        fs::remove_dir(&self.dir)
    }

    fn location(&self) -> PathBuf {
        self.dir.clone()
    }
}
