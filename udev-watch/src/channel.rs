//! The process-wide handle to the kernel notification facility.

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;

use inotify::Inotify;
use tracing::{error, info};

use crate::descriptor::WatchDescriptor;
use crate::event::{RawEvent, WatchMask};

/// Enough for a few hundred name-less records per read.
const READ_BUFFER_LEN: usize = 4096;

/// Kernel-side operations the registry needs.
pub trait NotifyBackend {
    /// Watch `path` for the events in `mask`.
    fn add_watch(&mut self, path: &Path, mask: WatchMask) -> io::Result<WatchDescriptor>;

    /// Drop the watch for `wd`.
    fn remove_watch(&mut self, wd: WatchDescriptor) -> io::Result<()>;

    /// Wait for and read the next batch of notification records.
    fn read_events(&mut self) -> io::Result<Vec<RawEvent>>;
}

type Watches = HashMap<WatchDescriptor, inotify::WatchDescriptor>;

/// An inotify instance, opened with close-on-exec set.
#[derive(Debug)]
pub struct InotifyBackend {
    inotify: Inotify,
    watches: Watches,
}

impl InotifyBackend {
    pub fn init() -> io::Result<Self> {
        Ok(Self {
            inotify: Inotify::init()?,
            watches: HashMap::new(),
        })
    }
}

impl AsRawFd for InotifyBackend {
    fn as_raw_fd(&self) -> RawFd {
        self.inotify.as_raw_fd()
    }
}

impl NotifyBackend for InotifyBackend {
    fn add_watch(&mut self, path: &Path, mask: WatchMask) -> io::Result<WatchDescriptor> {
        let handle = self.inotify.watches().add(path, mask)?;
        let wd = WatchDescriptor::new(handle.get_watch_descriptor_id());
        self.watches.insert(wd, handle);
        Ok(wd)
    }

    fn remove_watch(&mut self, wd: WatchDescriptor) -> io::Result<()> {
        let Some(handle) = self.watches.remove(&wd) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown watch descriptor {wd}"),
            ));
        };
        self.inotify.watches().remove(handle)
    }

    fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
        let mut buffer = [0u8; READ_BUFFER_LEN];
        let events = self
            .inotify
            .read_events_blocking(&mut buffer)?
            .map(RawEvent::from)
            .collect::<Vec<_>>();

        // The kernel has already dropped these.
        for event in &events {
            if event.is_ignored() {
                self.watches.remove(&event.wd);
            }
        }

        Ok(events)
    }
}

/// Notification channel, or the reason watching is disabled.
#[derive(Debug)]
pub enum NotifyChannel<B = InotifyBackend> {
    Available(B),

    /// Watch support is off for the lifetime of the process.
    Unavailable,
}

impl NotifyChannel<InotifyBackend> {
    /// Acquire the process inotify instance.
    ///
    /// Never fails: when the kernel lacks inotify, or acquisition fails for
    /// any other reason, the channel is `Unavailable` and every registry
    /// operation becomes a no-op.
    pub fn init() -> Self {
        Self::from_init(InotifyBackend::init())
    }
}

impl<B> NotifyChannel<B> {
    /// Map the result of acquiring a backend to a channel.
    pub fn from_init(backend: io::Result<B>) -> Self {
        match backend {
            Ok(backend) => Self::Available(backend),
            // ENOSYS
            Err(err) if err.kind() == io::ErrorKind::Unsupported => {
                info!("unable to use inotify, device watches are disabled");
                Self::Unavailable
            }
            Err(err) => {
                error!("inotify_init failed: {err}");
                Self::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn backend(&self) -> Option<&B> {
        match self {
            Self::Available(backend) => Some(backend),
            Self::Unavailable => None,
        }
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        match self {
            Self::Available(backend) => Some(backend),
            Self::Unavailable => None,
        }
    }
}
