//! Watch descriptors and their on-disk key encoding.

use std::fmt;

/// Handle of one active kernel watch.
///
/// Only meaningful for the lifetime of the inotify instance that created it.
/// The registry key for a descriptor is its decimal rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchDescriptor(i32);

impl WatchDescriptor {
    /// The value the kernel reports on failure.
    pub const INVALID: Self = Self(-1);

    pub fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    /// Whether this descriptor can name a live watch.
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Encode as a registry key.
    pub fn to_key(self) -> String {
        self.0.to_string()
    }

    /// Decode a registry key.
    ///
    /// Names that do not start with a digit are unrelated directory artifacts
    /// and never decode.
    pub fn from_key(key: &str) -> Option<Self> {
        if !is_descriptor_key(key) {
            return None;
        }
        key.parse::<i32>().ok().map(Self)
    }
}

impl fmt::Display for WatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a registry directory entry looks like a descriptor.
pub fn is_descriptor_key(name: &str) -> bool {
    name.as_bytes().first().is_some_and(u8::is_ascii_digit)
}
