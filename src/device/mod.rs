//! Touch device discovery, per-device reader threads and the hotplug rescan.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use evdevil::Evdev;

use crate::input::{DeviceInfo, InputHandler, TouchEvent};
use crate::wake::PWRKEY_DEVICE_NAME;

pub const INPUT_DIR: &str = "/dev/input";
pub const DEFAULT_NAME_PATTERNS: &[&str] = &["touch", "lge_touch_core"];
pub const RESCAN_INTERVAL: Duration = Duration::from_secs(2);

/// Which evdev nodes to listen to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Devices whose name contains any of the patterns.
    Names(Vec<String>),
    /// Exactly these device nodes.
    Paths(Vec<PathBuf>),
}

impl DeviceFilter {
    pub fn accepts(&self, device: &DeviceInfo) -> bool {
        if device.name == PWRKEY_DEVICE_NAME {
            return false;
        }
        match self {
            DeviceFilter::Names(patterns) => patterns.iter().any(|p| device.name.contains(p.as_str())),
            DeviceFilter::Paths(paths) => paths.iter().any(|p| p == &device.path),
        }
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        DeviceFilter::Names(DEFAULT_NAME_PATTERNS.iter().map(|p| p.to_string()).collect())
    }
}

/// Device nodes that currently have a reader thread.
#[derive(Debug, Clone, Default)]
pub struct ActiveDevices {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ActiveDevices {
    /// Mark `path` as being read. `None` if a reader already owns it.
    pub fn claim(&self, path: &Path) -> Option<ActiveGuard> {
        let Ok(mut paths) = self.paths.lock() else {
            return None;
        };
        if !paths.insert(path.to_path_buf()) {
            return None;
        }
        Some(ActiveGuard {
            paths: self.paths.clone(),
            path: path.to_path_buf(),
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.lock().map(|p| p.contains(path)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.paths.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its path when the reader thread ends.
pub struct ActiveGuard {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.remove(&self.path);
        }
    }
}

/// Every `eventN` node under `dir`, sorted.
pub fn list_event_nodes(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("event"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Open every `eventN` node under `dir`. Nodes that cannot be opened are
/// skipped with a debug log.
pub fn scan(dir: &Path) -> Result<Vec<(DeviceInfo, Evdev)>, Box<dyn std::error::Error + Send + Sync>> {
    let mut devices = Vec::new();
    for path in list_event_nodes(dir)? {
        match open(&path) {
            Ok(found) => devices.push(found),
            Err(e) => log::debug!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(devices)
}

pub fn open(path: &Path) -> io::Result<(DeviceInfo, Evdev)> {
    let evdev = Evdev::open(path)?;
    let name = evdev.name()?;
    let info = DeviceInfo {
        path: path.to_path_buf(),
        name,
    };
    Ok((info, evdev))
}

/// Start a reader for every node under `dir` that is not already being
/// read and that a fresh handler accepts. Returns how many were started.
pub fn connect_new<F, H>(
    dir: &Path,
    active: &ActiveDevices,
    make_handler: &F,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>>
where
    F: Fn() -> H,
    H: InputHandler + 'static,
{
    let mut started = 0;
    for path in list_event_nodes(dir)? {
        if active.contains(&path) {
            continue;
        }
        let (info, evdev) = match open(&path) {
            Ok(found) => found,
            Err(e) => {
                log::debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if spawn_reader(info, evdev, make_handler(), active)?.is_some() {
            started += 1;
        }
    }
    Ok(started)
}

/// Offer `device` to `handler` and, if accepted, read it on a new thread
/// until the device goes away. The node stays claimed in `active` for the
/// lifetime of the thread.
pub fn spawn_reader<H>(
    info: DeviceInfo,
    evdev: Evdev,
    mut handler: H,
    active: &ActiveDevices,
) -> io::Result<Option<JoinHandle<()>>>
where
    H: InputHandler + 'static,
{
    let Some(guard) = active.claim(&info.path) else {
        return Ok(None);
    };
    if !handler.on_connect(&info) {
        return Ok(None);
    }

    let name = format!("dt2w-{}", file_label(&info.path));
    let handle = thread::Builder::new().name(name).spawn(move || {
        read_events(&info, &evdev, &mut handler);
        drop(guard);
    })?;
    Ok(Some(handle))
}

fn read_events(info: &DeviceInfo, evdev: &Evdev, handler: &mut impl InputHandler) {
    for result in evdev.raw_events() {
        match result {
            Ok(ev) => {
                if let Some(event) = TouchEvent::from_input(&ev) {
                    handler.on_event(event);
                }
            }
            Err(e) => {
                log::error!("Read from {} failed: {}", info.path.display(), e);
                break;
            }
        }
    }
    handler.on_disconnect();
}

/// Rescan `dir` every `interval` and attach readers to touch devices that
/// appeared or came back after a disconnect.
pub fn spawn_watcher<F, H>(
    dir: PathBuf,
    interval: Duration,
    active: ActiveDevices,
    make_handler: F,
    stop: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>>
where
    F: Fn() -> H + Send + 'static,
    H: InputHandler + 'static,
{
    thread::Builder::new()
        .name("dt2w-rescan".into())
        .spawn(move || {
            let mut warned = active.is_empty();
            while wait_or_stop(interval, &stop) {
                match connect_new(&dir, &active, &make_handler) {
                    Ok(0) => {}
                    Ok(n) => log::info!("Rescan attached {} device(s)", n),
                    Err(e) => log::warn!("Rescan of {} failed: {}", dir.display(), e),
                }
                if !active.is_empty() {
                    warned = false;
                } else if !warned {
                    log::warn!("No touch device, rescanning every {}s…", interval.as_secs());
                    warned = true;
                }
            }
            log::debug!("Device watcher stopping");
        })
}

/// Sleep up to `interval`, waking early on `stop`. False once stopped.
fn wait_or_stop(interval: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    while Instant::now() < deadline {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        thread::sleep(Duration::from_millis(100).min(interval));
    }
    !stop.load(Ordering::Relaxed)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".into())
}
