mod coalesce;
mod config;
mod control;
mod device;
mod dispatch;
mod dump;
mod gesture;
mod input;
mod mode;
mod service;
mod suspend;
mod wake;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use config::{Cli, Command, Config};
use control::Request;
use device::{ActiveDevices, INPUT_DIR, RESCAN_INTERVAL};
use service::Tap2Wake;
use suspend::{SuspendFlag, SuspendMonitor};
use wake::UinputPowerKey;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let default_filter = if matches!(cli.command, Some(Command::Dump { .. })) {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = Config::load(&cli);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    match &cli.command {
        None => run_daemon(&config),
        Some(Command::Dump { device }) => dump::run_dump(device.as_deref(), &config.device_filter()),
        Some(Command::Get) => run_client(&config, Request::Get),
        Some(Command::Set { value }) => run_client(&config, Request::Set(value.clone())),
        Some(Command::Version) => run_client(&config, Request::Version),
        Some(Command::Suspend) => run_client(&config, Request::Suspend),
        Some(Command::Resume) => run_client(&config, Request::Resume),
        Some(Command::Quit) => run_client(&config, Request::Quit),
    }
}

fn run_client(config: &Config, request: Request) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let response = control::request(&config.socket_path, &request)?;
    println!("{}", response);
    if response.starts_with("err") {
        std::process::exit(1);
    }
    Ok(())
}

fn run_daemon(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = config.device_filter();
    log::info!(
        "tap2wake {} starting (devices={:?}, suspend_file={}, socket={})",
        mode::VERSION,
        filter,
        config
            .suspend_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".into()),
        config.socket_path.display()
    );

    let sink = UinputPowerKey::create().map_err(|e| {
        log::error!("Can't create power key device: {}", e);
        e
    })?;

    let suspend = Arc::new(SuspendFlag::new());
    let service = Tap2Wake::start(config.service_settings(), suspend.clone(), sink)?;

    let make_handler = service.handler_factory(filter.clone());
    let active = ActiveDevices::default();
    if device::connect_new(Path::new(INPUT_DIR), &active, &make_handler)? == 0 {
        log::error!("No touch device matched {:?}", filter);
        return Err("No touch device to listen on".into());
    }

    let stop = Arc::new(AtomicBool::new(false));
    let watcher = device::spawn_watcher(
        INPUT_DIR.into(),
        RESCAN_INTERVAL,
        active,
        make_handler,
        stop.clone(),
    )?;
    let monitor = match &config.suspend_file {
        Some(path) => Some(
            SuspendMonitor::new(path, Duration::from_millis(config.suspend_poll_ms), suspend)
                .spawn(stop.clone())?,
        ),
        None => {
            log::info!("No suspend file configured, waiting for suspend/resume on the control socket");
            None
        }
    };

    let listener = control::bind(&config.socket_path)?;
    control::serve(&listener, &service);

    stop.store(true, Ordering::Relaxed);
    if let Some(handle) = monitor {
        if handle.join().is_err() {
            log::warn!("Suspend monitor panicked");
        }
    }
    if watcher.join().is_err() {
        log::warn!("Device watcher panicked");
    }
    service.shutdown();
    let _ = std::fs::remove_file(&config.socket_path);

    Ok(())
}
