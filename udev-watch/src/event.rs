//! Notification records delivered by the kernel.

use std::ffi::{OsStr, OsString};

pub use inotify::{EventMask, WatchMask};

use crate::descriptor::WatchDescriptor;

/// One inotify record, detached from the read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub wd: WatchDescriptor,
    pub mask: EventMask,
    pub cookie: u32,

    /// Name of the child entry for directory watches.
    pub name: Option<OsString>,
}

impl RawEvent {
    /// A record for a watch with no child name, i.e. a device node.
    pub fn new(wd: WatchDescriptor, mask: EventMask) -> Self {
        Self {
            wd,
            mask,
            cookie: 0,
            name: None,
        }
    }

    /// Whether the kernel dropped the watch.
    pub fn is_ignored(&self) -> bool {
        self.mask.contains(EventMask::IGNORED)
    }
}

impl From<inotify::Event<&OsStr>> for RawEvent {
    fn from(event: inotify::Event<&OsStr>) -> Self {
        Self {
            wd: WatchDescriptor::new(event.wd.get_watch_descriptor_id()),
            mask: event.mask,
            cookie: event.cookie,
            name: event.name.map(OsStr::to_os_string),
        }
    }
}

/// What happened to a watched device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A writer closed the device node.
    Closed,

    /// The kernel dropped the watch, e.g. because the node went away.
    Removed,
}

/// A kernel event attributed to a registered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchNotification {
    pub descriptor: WatchDescriptor,
    pub syspath: String,
    pub kind: NotificationKind,
}
