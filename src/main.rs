use anyhow::{Context, Result};
use clap::Parser;
use devwatch::host::Host;
use devwatch::{config, logging, plugins, DeviceEvent, FilteredDeviceWatcher, UdevDatabase};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

/// Watch device hotplug events and attach renderers to matching devices.
#[derive(Parser, Debug)]
#[command(name = "devwatch", version, about)]
struct Cli {
    /// Config file (default: ~/.config/devwatch/devwatch.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overrides the config file (RUST_LOG overrides both)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Scan once, print matching devices and exit
    #[arg(long)]
    once: bool,

    /// List renderer plugins and exit
    #[arg(long)]
    list_plugins: bool,
}

const MONITOR: Token = Token(0);

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("devwatch: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load_config()?,
    };
    logging::init(cli.log_level.as_deref().unwrap_or(&config.log_level))?;

    let registry = plugins::builtin_registry().context("Failed to register renderer plugins")?;
    if cli.list_plugins {
        for info in registry.plugin_infos() {
            println!("{:<12} {}", info.name, info.description);
        }
        return Ok(());
    }

    let mut watcher = FilteredDeviceWatcher::filtered_with_database(
        Box::new(UdevDatabase::new()?),
        config.matching.to_criteria(),
    );

    if cli.once {
        let mut found: Vec<DeviceEvent> = Vec::new();
        watcher.scan(&mut found)?;
        for event in &found {
            let device = event.description();
            println!("{}\t{}\t{}", device.dev_path(), device.subsystem(), device.dev_node());
        }
        return Ok(());
    }

    let mut host = Host::new(&registry, config.renderers.clone());
    for name in host.unknown_plugins() {
        warn!("No renderer plugin named '{}', entry ignored", name);
    }

    watcher.set_active(true, &mut host)?;
    let fd = watcher
        .monitor_fd()
        .context("Device monitor has no descriptor")?;

    let mut poll = Poll::new().context("Failed to create event loop")?;
    poll.registry()
        .register(&mut SourceFd(&fd), MONITOR, Interest::READABLE)
        .context("Failed to register device monitor")?;
    let mut events = Events::with_capacity(16);

    info!("Watching {} device(s)", host.device_count());
    loop {
        // Edge-triggered: drain everything pending before waiting again
        while watcher.process_pending(&mut host) {}

        if let Err(e) = poll.poll(&mut events, None) {
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(e).context("Event loop failed");
        }
    }
}
