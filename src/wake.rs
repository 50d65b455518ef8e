//! Synthetic power-key injection.
//!
//! A wake is a press, hold, release, hold sequence on `KEY_POWER`. Only one
//! sequence may be in flight; `fire` calls that arrive while one is running
//! are dropped rather than queued so a burst of taps cannot turn into a
//! burst of power-key presses.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use evdevil::event::{InputEvent, Key};
use evdevil::uinput::UinputDevice;

use crate::input::event::key_event;

pub const DEFAULT_PWRKEY_MS: u64 = 60;
pub const PWRKEY_DEVICE_NAME: &str = "dt2w_pwrkey";

/// Where synthetic key events end up.
pub trait KeySink: Send {
    fn emit_key(&mut self, code: u16, pressed: bool) -> io::Result<()>;
    fn emit_sync(&mut self) -> io::Result<()>;
}

/// uinput device exposing a single power key.
///
/// Key events are held until `emit_sync` and then written as one batch.
/// `UinputDevice::write` appends the SYN_REPORT itself, so each press or
/// release reaches the device as exactly one frame.
pub struct UinputPowerKey {
    device: UinputDevice,
    frame: Frame,
}

/// Events waiting for the next frame boundary.
#[derive(Debug, Default)]
struct Frame {
    batch: Vec<InputEvent>,
}

impl Frame {
    fn push(&mut self, code: u16, pressed: bool) {
        self.batch.push(key_event(code, pressed as i32));
    }

    fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    fn take(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.batch)
    }
}

impl UinputPowerKey {
    pub fn create() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let device = UinputDevice::builder()?
            .with_keys([Key::KEY_POWER])?
            .build(PWRKEY_DEVICE_NAME)?;

        if let Ok(name) = device.sysname() {
            log::info!(
                "Power key device ready: /sys/devices/virtual/input/{}",
                name.to_string_lossy()
            );
        }

        Ok(Self {
            device,
            frame: Frame::default(),
        })
    }
}

impl KeySink for UinputPowerKey {
    fn emit_key(&mut self, code: u16, pressed: bool) -> io::Result<()> {
        self.frame.push(code, pressed);
        Ok(())
    }

    fn emit_sync(&mut self) -> io::Result<()> {
        if self.frame.is_empty() {
            return Ok(());
        }
        self.device.write(&self.frame.take())
    }
}

/// Non-blocking single-owner lock. Released when the guard drops.
#[derive(Debug, Default)]
pub struct WakeLock {
    held: AtomicBool,
}

impl WakeLock {
    pub fn try_acquire(self: &Arc<Self>) -> Option<WakeLockGuard> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| WakeLockGuard { lock: self.clone() })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

pub struct WakeLockGuard {
    lock: Arc<WakeLock>,
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}

/// Handle used to request a wake. Cheap to clone.
#[derive(Clone)]
pub struct WakeTrigger {
    lock: Arc<WakeLock>,
    requests: Sender<WakeLockGuard>,
}

impl WakeTrigger {
    /// Start the wake worker thread. The worker owns `sink` and exits once
    /// every `WakeTrigger` clone has been dropped.
    pub fn spawn(
        sink: impl KeySink + 'static,
        hold: Duration,
    ) -> io::Result<(Self, JoinHandle<()>)> {
        let (requests, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("dt2w-pwrkey".into())
            .spawn(move || run_worker(sink, rx, hold))?;

        let trigger = Self {
            lock: Arc::new(WakeLock::default()),
            requests,
        };
        Ok((trigger, handle))
    }

    /// Request one press/release sequence. Returns `false` when a sequence
    /// is already in flight and the request was dropped.
    pub fn fire(&self) -> bool {
        let Some(guard) = self.lock.try_acquire() else {
            log::debug!("Power key sequence already running, dropping request");
            return false;
        };

        if self.requests.send(guard).is_err() {
            // The guard comes back inside the error and is dropped here.
            log::warn!("Power key worker is gone, cannot wake");
            return false;
        }
        true
    }

    pub fn is_busy(&self) -> bool {
        self.lock.is_held()
    }
}

fn run_worker(mut sink: impl KeySink, rx: Receiver<WakeLockGuard>, hold: Duration) {
    let code = Key::KEY_POWER.raw();
    let mut count: u64 = 0;

    for _guard in rx {
        count += 1;
        log::info!("Injecting power key (wake #{})", count);

        if let Err(e) = press(&mut sink, code, true) {
            log::warn!("Power key press failed: {}", e);
        }
        thread::sleep(hold);
        if let Err(e) = press(&mut sink, code, false) {
            log::warn!("Power key release failed: {}", e);
        }
        thread::sleep(hold);
    }

    log::debug!("Power key worker stopping");
}

fn press(sink: &mut impl KeySink, code: u16, pressed: bool) -> io::Result<()> {
    sink.emit_key(code, pressed)?;
    sink.emit_sync()
}
