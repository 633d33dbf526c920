use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use udev_watch::{
    DeviceResolver, FsWatchStore, NotificationKind, NotifyChannel, Outcome, SysfsResolver,
    WatchConfig, WatchDescriptor, WatchRegistry, WatchStore,
};

#[derive(Debug, Parser)]
#[command(name = "udev-watchctl")]
#[command(about = "Inspect and drive the persistent device watch registry")]
struct Cli {
    /// TOML file with `dev_root` and `sys_root`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Device tree root; overrides the config file.
    #[arg(long, global = true)]
    dev_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every recorded watch as `wd -> syspath`.
    List,

    /// Print the device recorded for one watch descriptor.
    Lookup {
        wd: i32,
    },

    /// Restore the previous watches and log notifications until killed.
    Run {
        /// Device to watch, as an absolute syspath or relative to the sysfs root.
        #[arg(long = "watch")]
        watch: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = load_config(cli.config.as_deref(), cli.dev_root)?;
    match cli.command {
        Command::List => list(&config),
        Command::Lookup { wd } => lookup(&config, WatchDescriptor::new(wd)),
        Command::Run { watch } => run(&config, &watch),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, dev_root: Option<PathBuf>) -> anyhow::Result<WatchConfig> {
    let mut config = match path {
        Some(path) => WatchConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => WatchConfig::default(),
    };
    if let Some(dev_root) = dev_root {
        config.dev_root = dev_root;
    }
    Ok(config)
}

fn store(config: &WatchConfig) -> FsWatchStore {
    FsWatchStore::new(config.watch_dir(), config.previous_watch_dir())
}

/// Entries of the on-disk registry in descriptor order.
fn entries(store: &FsWatchStore) -> anyhow::Result<Vec<(WatchDescriptor, String)>> {
    let keys = match store.keys() {
        Ok(keys) => keys,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", store.dir().display()));
        }
    };

    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        let Some(wd) = WatchDescriptor::from_key(&key) else {
            warn!("skipping malformed watch entry {key}");
            continue;
        };
        match store.get(&key) {
            Ok(Some(target)) => entries.push((wd, target)),
            Ok(None) => {}
            Err(e) => warn!("skipping unreadable watch entry {key}: {e}"),
        }
    }
    entries.sort();
    Ok(entries)
}

fn list(config: &WatchConfig) -> anyhow::Result<()> {
    for (wd, syspath) in entries(&store(config))? {
        println!("{wd} -> {syspath}");
    }
    Ok(())
}

fn lookup(config: &WatchConfig, wd: WatchDescriptor) -> anyhow::Result<()> {
    match store(config).get(&wd.to_key())? {
        Some(syspath) => {
            println!("{syspath}");
            Ok(())
        }
        None => bail!("no watch recorded for descriptor {wd}"),
    }
}

fn syspath_arg(config: &WatchConfig, arg: &Path) -> String {
    let path = if arg.is_absolute() {
        arg.to_path_buf()
    } else {
        config.sys_root.join(arg)
    };
    path.to_string_lossy().into_owned()
}

fn run(config: &WatchConfig, watch: &[PathBuf]) -> anyhow::Result<()> {
    let channel = NotifyChannel::init();
    if !channel.is_available() {
        bail!("inotify is not available");
    }

    let mut registry = WatchRegistry::from_config(channel, config);
    let resolver = SysfsResolver::new(&config.dev_root);

    if let Outcome::Done(report) = registry.restore(&resolver) {
        info!(
            "restored {} watches, dropped {}",
            report.restored, report.dropped
        );
    }

    for arg in watch {
        let syspath = syspath_arg(config, arg);
        let device = resolver
            .resolve(&syspath)
            .with_context(|| format!("no such device: {syspath}"))?;
        if let Outcome::Degraded(err) = registry.clear(&device) {
            warn!("unable to clear old watches on {syspath}: {err}");
        }
        if let Outcome::Degraded(err) = registry.begin(&device) {
            return Err(err).with_context(|| format!("failed to watch {syspath}"));
        }
    }

    loop {
        match registry.process_events() {
            Outcome::Done(notifications) => {
                for notification in notifications {
                    match notification.kind {
                        NotificationKind::Closed => {
                            info!("device {} closed after write", notification.syspath);
                        }
                        NotificationKind::Removed => {
                            info!("watch on {} removed", notification.syspath);
                        }
                    }
                }
            }
            Outcome::Degraded(err) => return Err(err).context("inotify read failed"),
            Outcome::Skipped => return Ok(()),
        }
    }
}
