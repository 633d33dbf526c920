//! Rebuilding kernel watches from the previous run's registry.

use tracing::{debug, error, info, warn};

use crate::channel::NotifyBackend;
use crate::device::DeviceResolver;
use crate::error::{Outcome, WatchError};
use crate::registry::WatchRegistry;
use crate::store::WatchStore;

/// Counts from one restore pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Old entries that produced a new watch.
    pub restored: usize,

    /// Old entries that were broken or whose device is gone.
    pub dropped: usize,
}

impl<B: NotifyBackend, S: WatchStore> WatchRegistry<B, S> {
    /// Move the old registry aside and re-create a watch for every device in
    /// it that still exists.
    ///
    /// Must run once at startup before any other watch traffic. New entries
    /// are written to the live location while the displaced copy is drained,
    /// so the live registry is never half written.
    pub fn restore(&mut self, resolver: &dyn DeviceResolver) -> Outcome<RestoreReport> {
        if !self.channel.is_available() {
            return Outcome::Skipped;
        }

        let mut previous = match self.store.displace() {
            Ok(Some(previous)) => previous,
            Ok(None) => return Outcome::Done(RestoreReport::default()),
            Err(source) => {
                let err = WatchError::Rename {
                    path: self.store.location(),
                    source,
                };
                error!("{err}, old watches will not be restored");
                return Outcome::Degraded(err);
            }
        };

        let previous_path = previous.location();

        // Left in place on failure for manual inspection.
        let keys = match previous.keys() {
            Ok(keys) => keys,
            Err(source) => {
                let err = WatchError::OpenPrevious {
                    path: previous_path,
                    source,
                };
                error!("{err}, old watches will not be restored");
                return Outcome::Degraded(err);
            }
        };

        let mut report = RestoreReport::default();
        for key in keys {
            let syspath = match previous.get(&key) {
                Ok(Some(syspath)) => syspath,
                Ok(None) | Err(_) => {
                    debug!("dropping broken watch entry {key}");
                    discard_entry(&mut previous, &key);
                    report.dropped += 1;
                    continue;
                }
            };

            debug!("old watch to '{syspath}' found");
            let Some(device) = resolver.resolve(&syspath) else {
                debug!("device '{syspath}' is gone, dropping old watch {key}");
                discard_entry(&mut previous, &key);
                report.dropped += 1;
                continue;
            };

            info!("restoring old watch on '{}'", device.devnode.display());
            if self.begin(&device).is_done() {
                report.restored += 1;
            } else {
                report.dropped += 1;
            }
            discard_entry(&mut previous, &key);
        }

        if let Err(e) = previous.discard() {
            warn!(
                "unable to remove old watches dir '{}': {e}",
                previous_path.display()
            );
        }

        Outcome::Done(report)
    }
}

fn discard_entry<S: WatchStore>(store: &mut S, key: &str) {
    if let Err(e) = store.delete(key) {
        debug!("unable to remove old watch entry {key}: {e}");
    }
}
