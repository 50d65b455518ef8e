use std::path::PathBuf;
use std::time::Instant;

use crate::coalesce::{Coalesced, Coalescer};
use crate::device::DeviceFilter;
use crate::dispatch::Dispatcher;

use super::event::TouchEvent;

/// Identity of an evdev node offered to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
}

/// Per-device callbacks driven by a reader thread.
pub trait InputHandler: Send {
    /// Decide whether to listen to this device.
    fn on_connect(&mut self, device: &DeviceInfo) -> bool;
    fn on_event(&mut self, event: TouchEvent);
    fn on_disconnect(&mut self);
}

/// Milliseconds since daemon start, from `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Feeds one device's events through its own coalescer into the shared
/// dispatch queue. Never blocks.
pub struct TouchHandler {
    filter: DeviceFilter,
    coalescer: Coalescer,
    dispatcher: Dispatcher,
    clock: MonotonicClock,
    device: Option<DeviceInfo>,
}

impl TouchHandler {
    pub fn new(filter: DeviceFilter, dispatcher: Dispatcher, clock: MonotonicClock) -> Self {
        Self {
            filter,
            coalescer: Coalescer::new(),
            dispatcher,
            clock,
            device: None,
        }
    }

    pub fn on_event_at(&mut self, event: TouchEvent, now_ms: u64) {
        match self.coalescer.update(event, now_ms) {
            Coalesced::Pending => {}
            Coalesced::Reset => self.dispatcher.reset(),
            Coalesced::Sample(sample) => self.dispatcher.detect(sample),
        }
    }
}

impl InputHandler for TouchHandler {
    fn on_connect(&mut self, device: &DeviceInfo) -> bool {
        if !self.filter.accepts(device) {
            return false;
        }
        log::info!("Listening on {} ({})", device.path.display(), device.name);
        self.device = Some(device.clone());
        true
    }

    fn on_event(&mut self, event: TouchEvent) {
        let now = self.clock.now_ms();
        self.on_event_at(event, now);
    }

    fn on_disconnect(&mut self) {
        self.coalescer.reset();
        self.dispatcher.reset();
        if let Some(device) = self.device.take() {
            log::warn!("Lost {} ({})", device.path.display(), device.name);
        }
    }
}
