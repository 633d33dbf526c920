//! Shared fixtures for registry integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::TempDir;
use udev_watch::{
    DevNum, Device, DeviceResolver, NotifyBackend, NotifyChannel, RawEvent, WatchConfig,
    WatchDescriptor, WatchMask, WatchRegistry, WatchStore,
};

/// In-memory stand-in for the kernel watch table.
#[derive(Debug, Default)]
pub struct FakeBackend {
    next_wd: i32,
    pub watches: BTreeMap<WatchDescriptor, PathBuf>,
    pub pending: Vec<RawEvent>,
    pub fail_add: bool,
}

impl FakeBackend {
    /// Descriptors start at `first` so tests can tell them from old ones.
    pub fn starting_at(first: i32) -> Self {
        Self {
            next_wd: first,
            ..Self::default()
        }
    }

    pub fn is_watching(&self, wd: WatchDescriptor) -> bool {
        self.watches.contains_key(&wd)
    }
}

impl NotifyBackend for FakeBackend {
    fn add_watch(&mut self, path: &Path, _mask: WatchMask) -> io::Result<WatchDescriptor> {
        if self.fail_add {
            return Err(io::Error::other("inotify watch limit reached"));
        }
        let wd = WatchDescriptor::new(self.next_wd);
        self.next_wd += 1;
        self.watches.insert(wd, path.to_path_buf());
        Ok(wd)
    }

    fn remove_watch(&mut self, wd: WatchDescriptor) -> io::Result<()> {
        match self.watches.remove(&wd) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(io::ErrorKind::InvalidInput, "no such watch")),
        }
    }

    fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
        Ok(std::mem::take(&mut self.pending))
    }
}

/// A store that moves aside fine but cannot be enumerated afterwards.
#[derive(Debug, Default)]
pub struct UnreadableStore {
    displaced: bool,
    pub discarded: Rc<Cell<bool>>,
}

impl WatchStore for UnreadableStore {
    fn put(&mut self, _key: &str, _identity: &str) -> io::Result<()> {
        Ok(())
    }

    fn get(&self, _key: &str) -> io::Result<Option<String>> {
        Ok(None)
    }

    fn delete(&mut self, _key: &str) -> io::Result<bool> {
        Ok(false)
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        if self.displaced {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        } else {
            Ok(Vec::new())
        }
    }

    fn displace(&mut self) -> io::Result<Option<Self>> {
        Ok(Some(Self {
            displaced: true,
            discarded: Rc::clone(&self.discarded),
        }))
    }

    fn discard(self) -> io::Result<()> {
        self.discarded.set(true);
        Ok(())
    }

    fn location(&self) -> PathBuf {
        PathBuf::from(if self.displaced { "watch.old" } else { "watch" })
    }
}

/// Resolves a fixed set of devices.
#[derive(Debug, Default)]
pub struct MapResolver {
    devices: HashMap<String, Device>,
}

impl MapResolver {
    pub fn with(mut self, device: Device) -> Self {
        self.devices.insert(device.syspath.clone(), device);
        self
    }
}

impl DeviceResolver for MapResolver {
    fn resolve(&self, syspath: &str) -> Option<Device> {
        self.devices.get(syspath).cloned()
    }
}

pub fn block_device(syspath: &str, node: &str, minor: u32) -> Device {
    Device::new(syspath, format!("/dev/{node}"), DevNum::new(8, minor))
}

pub fn virtual_device(syspath: &str) -> Device {
    Device::new(syspath, "/dev/null-ish", DevNum::new(0, 0))
}

/// A registry over a scratch device tree.
pub struct Harness {
    pub root: TempDir,
    pub config: WatchConfig,
    pub registry: WatchRegistry<FakeBackend>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backend(FakeBackend::starting_at(1))
    }

    pub fn with_backend(backend: FakeBackend) -> Self {
        let root = TempDir::new().unwrap();
        let config = WatchConfig::new(root.path());
        let registry = WatchRegistry::from_config(NotifyChannel::Available(backend), &config);
        Self {
            root,
            config,
            registry,
        }
    }

    pub fn unavailable() -> Self {
        let root = TempDir::new().unwrap();
        let config = WatchConfig::new(root.path());
        let registry = WatchRegistry::from_config(NotifyChannel::Unavailable, &config);
        Self {
            root,
            config,
            registry,
        }
    }

    pub fn backend(&self) -> &FakeBackend {
        self.registry.channel().backend().unwrap()
    }

    pub fn backend_mut(&mut self) -> &mut FakeBackend {
        self.registry.channel_mut().backend_mut().unwrap()
    }

    /// Registry entries as `(name, target)` pairs, sorted by name.
    pub fn entries(&self, dir: &Path) -> Vec<(String, String)> {
        let Ok(read_dir) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut entries: Vec<_> = read_dir
            .map(|entry| {
                let entry = entry.unwrap();
                let target = std::fs::read_link(entry.path())
                    .map(|t| t.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (entry.file_name().to_string_lossy().into_owned(), target)
            })
            .collect();
        entries.sort();
        entries
    }

    pub fn live_entries(&self) -> Vec<(String, String)> {
        self.entries(&self.config.watch_dir())
    }

    /// Seed an entry directly on disk, as a previous run would have left it.
    pub fn seed(&self, name: &str, target: &str) {
        let dir = self.config.watch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink(target, dir.join(name)).unwrap();
    }
}
