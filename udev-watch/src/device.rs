//! The slice of the device model the registry needs.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Device number as reported by sysfs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DevNum {
    pub major: u32,
    pub minor: u32,
}

impl DevNum {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse the `major:minor` text of a sysfs `dev` attribute.
    pub fn parse(text: &str) -> Option<Self> {
        let (major, minor) = text.trim().split_once(':')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

/// A device that can be watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Stable identity path, valid across restarts.
    pub syspath: String,

    /// Transient device node path.
    pub devnode: PathBuf,

    /// Device number; major 0 means no real device instance.
    pub devnum: DevNum,
}

impl Device {
    pub fn new(syspath: impl Into<String>, devnode: impl Into<PathBuf>, devnum: DevNum) -> Self {
        Self {
            syspath: syspath.into(),
            devnode: devnode.into(),
            devnum,
        }
    }

    /// Devices without a major number are never watched.
    pub fn is_watchable(&self) -> bool {
        self.devnum.major != 0
    }
}

/// Resolves an identity path back to a live device.
pub trait DeviceResolver {
    /// Returns `None` when the device is no longer present.
    fn resolve(&self, syspath: &str) -> Option<Device>;
}

/// Resolves devices by reading their sysfs attributes.
#[derive(Debug, Clone)]
pub struct SysfsResolver {
    dev_root: PathBuf,
}

impl SysfsResolver {
    /// Device nodes are placed under `dev_root`.
    pub fn new(dev_root: impl Into<PathBuf>) -> Self {
        Self {
            dev_root: dev_root.into(),
        }
    }

    fn devnode(&self, syspath: &Path) -> PathBuf {
        let name = fs::read_to_string(syspath.join("uevent"))
            .ok()
            .and_then(|uevent| {
                uevent
                    .lines()
                    .find_map(|line| line.strip_prefix("DEVNAME="))
                    .map(str::to_string)
            })
            .or_else(|| {
                syspath
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        self.dev_root.join(name)
    }
}

impl DeviceResolver for SysfsResolver {
    fn resolve(&self, syspath: &str) -> Option<Device> {
        let path = Path::new(syspath);
        if !path.is_dir() {
            debug!("device '{syspath}' is gone");
            return None;
        }

        let devnum = fs::read_to_string(path.join("dev"))
            .ok()
            .and_then(|text| DevNum::parse(&text))
            .unwrap_or_default();

        Some(Device::new(syspath, self.devnode(path), devnum))
    }
}
