//! The durable map from kernel watches to device identities.

use tracing::{debug, error, info, warn};

use crate::channel::{InotifyBackend, NotifyBackend, NotifyChannel};
use crate::config::WatchConfig;
use crate::descriptor::WatchDescriptor;
use crate::device::Device;
use crate::error::{Outcome, WatchError};
use crate::event::{EventMask, NotificationKind, WatchMask, WatchNotification};
use crate::store::{FsWatchStore, WatchStore};

/// Keeps the kernel watch table and its on-disk mirror in step.
///
/// Every mutating operation takes `&mut self`; the registry expects a single
/// owner driving it from one thread.
#[derive(Debug)]
pub struct WatchRegistry<B = InotifyBackend, S = FsWatchStore> {
    pub(crate) channel: NotifyChannel<B>,
    pub(crate) store: S,
}

impl<B: NotifyBackend> WatchRegistry<B, FsWatchStore> {
    /// A registry persisting under the configured device tree.
    pub fn from_config(channel: NotifyChannel<B>, config: &WatchConfig) -> Self {
        let store = FsWatchStore::new(config.watch_dir(), config.previous_watch_dir());
        Self::new(channel, store)
    }
}

impl<B: NotifyBackend, S: WatchStore> WatchRegistry<B, S> {
    pub fn new(channel: NotifyChannel<B>, store: S) -> Self {
        Self { channel, store }
    }

    pub fn channel(&self) -> &NotifyChannel<B> {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut NotifyChannel<B> {
        &mut self.channel
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start watching `device` for writers closing its node.
    ///
    /// If the kernel refuses the watch nothing is recorded. If the entry
    /// cannot be written the kernel watch is dropped again.
    pub fn begin(&mut self, device: &Device) -> Outcome<WatchDescriptor> {
        let NotifyChannel::Available(backend) = &mut self.channel else {
            return Outcome::Skipped;
        };
        if !device.is_watchable() {
            return Outcome::Skipped;
        }

        let wd = match backend.add_watch(&device.devnode, WatchMask::CLOSE_WRITE) {
            Ok(wd) => wd,
            Err(source) => {
                let err = WatchError::AddWatch {
                    path: device.devnode.clone(),
                    source,
                };
                error!("{err}");
                return Outcome::Degraded(err);
            }
        };

        if let Err(source) = self.store.put(&wd.to_key(), &device.syspath) {
            let err = WatchError::Store {
                key: wd.to_key(),
                source,
            };
            error!(
                "unable to record watch on '{}': {err}",
                device.devnode.display()
            );
            if let Err(e) = backend.remove_watch(wd) {
                debug!("inotify_rm_watch({wd}) failed: {e}");
            }
            return Outcome::Degraded(err);
        }

        debug!("watching '{}' as {wd}", device.devnode.display());
        Outcome::Done(wd)
    }

    /// Stop the watch `wd` and forget its entry. Safe to repeat.
    pub fn end(&mut self, wd: WatchDescriptor) -> Outcome {
        let NotifyChannel::Available(backend) = &mut self.channel else {
            return Outcome::Skipped;
        };
        if !wd.is_valid() {
            return Outcome::Skipped;
        }

        if let Err(e) = backend.remove_watch(wd) {
            debug!("inotify_rm_watch({wd}) failed: {e}");
        }

        match self.store.delete(&wd.to_key()) {
            Ok(_) => Outcome::Done(()),
            Err(source) => {
                let err = WatchError::Store {
                    key: wd.to_key(),
                    source,
                };
                warn!("unable to remove watch entry: {err}");
                Outcome::Degraded(err)
            }
        }
    }

    /// End every watch recorded for `device`. Returns how many were ended.
    pub fn clear(&mut self, device: &Device) -> Outcome<usize> {
        if !self.channel.is_available() || !device.is_watchable() {
            return Outcome::Skipped;
        }

        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                debug!("no watches to clear: {e}");
                return Outcome::Done(0);
            }
        };

        let mut cleared = 0;
        for key in keys {
            match self.store.get(&key) {
                Ok(Some(target)) if target == device.syspath => {}
                Ok(_) => continue,
                Err(e) => {
                    debug!("skipping unreadable watch entry {key}: {e}");
                    continue;
                }
            }

            info!("clearing existing watch on '{}'", device.devnode.display());
            let ended = match WatchDescriptor::from_key(&key) {
                Some(wd) => self.end(wd).is_done(),
                // No kernel watch can carry this name.
                None => match self.store.delete(&key) {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("unable to remove watch entry {key}: {e}");
                        false
                    }
                },
            };
            if ended {
                cleared += 1;
            }
        }

        Outcome::Done(cleared)
    }

    /// The identity path recorded for `wd`.
    pub fn lookup(&self, wd: WatchDescriptor) -> Option<String> {
        if !self.channel.is_available() || !wd.is_valid() {
            return None;
        }

        match self.store.get(&wd.to_key()) {
            Ok(target) => target,
            Err(e) => {
                debug!("unable to read watch entry {wd}: {e}");
                None
            }
        }
    }

    /// Read pending kernel events and attribute them to registered devices.
    ///
    /// When the kernel reports a watch as dropped its entry is removed too.
    pub fn process_events(&mut self) -> Outcome<Vec<WatchNotification>> {
        let NotifyChannel::Available(backend) = &mut self.channel else {
            return Outcome::Skipped;
        };

        let events = match backend.read_events() {
            Ok(events) => events,
            Err(e) => {
                error!("error reading inotify events: {e}");
                return Outcome::Degraded(e.into());
            }
        };

        let mut notifications = Vec::new();
        for event in events {
            if let Some(name) = &event.name {
                debug!(
                    "inotify event {:?} for '{}'",
                    event.mask,
                    name.to_string_lossy()
                );
                continue;
            }

            let Some(syspath) = self.lookup(event.wd) else {
                debug!(
                    "inotify event {:?} for unknown watch {}",
                    event.mask, event.wd
                );
                continue;
            };

            if event.mask.contains(EventMask::CLOSE_WRITE) {
                notifications.push(WatchNotification {
                    descriptor: event.wd,
                    syspath: syspath.clone(),
                    kind: NotificationKind::Closed,
                });
            }

            if event.is_ignored() {
                debug!("watch {} on '{syspath}' dropped by the kernel", event.wd);
                _ = self.end(event.wd);
                notifications.push(WatchNotification {
                    descriptor: event.wd,
                    syspath,
                    kind: NotificationKind::Removed,
                });
            }
        }

        Outcome::Done(notifications)
    }
}
