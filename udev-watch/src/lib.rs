//! # udev-watch
//!
//! This crate keeps track of which device nodes the device manager is
//! watching with inotify, and makes that survive a restart of the daemon.
//!
//! ## Features
//!
//! - **Watch Registry**: Begin, end, clear and look up device watches
//! - **Durable Mirror**: Every kernel watch is recorded as a symlink on disk
//! - **Restore**: Rebuild watches from the previous run's registry at startup
//! - **Degraded Mode**: Without inotify every operation is a quiet no-op
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Watch Registry                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Device ──► WatchRegistry ──► NotifyChannel (inotify)          │
//! │                  │                                              │
//! │                  ▼                                              │
//! │            FsWatchStore   <dev>/.udev/watch/<wd> -> <syspath>  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use udev_watch::{NotifyChannel, SysfsResolver, WatchConfig, WatchRegistry};
//!
//! let config = WatchConfig::default();
//! let mut registry = WatchRegistry::from_config(NotifyChannel::init(), &config);
//! registry.restore(&SysfsResolver::new(&config.dev_root));
//! ```

pub mod channel;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod event;
pub mod registry;
pub mod restore;
pub mod store;

pub use channel::{InotifyBackend, NotifyBackend, NotifyChannel};
pub use config::WatchConfig;
pub use descriptor::WatchDescriptor;
pub use device::{DevNum, Device, DeviceResolver, SysfsResolver};
pub use error::{Outcome, Result, WatchError};
pub use event::{EventMask, NotificationKind, RawEvent, WatchMask, WatchNotification};
pub use registry::WatchRegistry;
pub use restore::RestoreReport;
pub use store::{FsWatchStore, WatchStore};
