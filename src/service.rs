//! The running double-tap service: owns the shared state and worker threads
//! and hands out per-device handlers.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::device::DeviceFilter;
use crate::dispatch::{self, Dispatcher, WorkerContext};
use crate::gesture::GestureConfig;
use crate::input::{MonotonicClock, TouchHandler};
use crate::mode::{parse_written, Mode, ModeError, ModeSwitch};
use crate::suspend::SharedSuspendFlag;
use crate::wake::{KeySink, WakeTrigger, DEFAULT_PWRKEY_MS};

pub const DEFAULT_SETTLE_MS: u64 = 400;

#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub gesture: GestureConfig,
    pub pwrkey_hold: Duration,
    /// Wait after a forced wake before a mode change is applied.
    pub settle: Duration,
    pub initial_mode: Mode,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            pwrkey_hold: Duration::from_millis(DEFAULT_PWRKEY_MS),
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            initial_mode: Mode::default(),
        }
    }
}

pub struct Tap2Wake {
    suspend: SharedSuspendFlag,
    mode: Arc<ModeSwitch>,
    dispatcher: Dispatcher,
    wake: WakeTrigger,
    clock: MonotonicClock,
    settle: Duration,
    workers: Vec<JoinHandle<()>>,
}

impl Tap2Wake {
    /// Start the wake and detection workers.
    pub fn start(
        settings: ServiceSettings,
        suspend: SharedSuspendFlag,
        sink: impl KeySink + 'static,
    ) -> io::Result<Self> {
        let (wake, wake_worker) = WakeTrigger::spawn(sink, settings.pwrkey_hold)?;
        let mode = Arc::new(ModeSwitch::new(settings.initial_mode));

        let (dispatcher, detect_worker) = dispatch::spawn(WorkerContext {
            gesture: settings.gesture,
            suspend: suspend.clone(),
            mode: mode.clone(),
            wake: wake.clone(),
        })?;

        log::info!(
            "Double tap service started (mode {}, timeout {}ms, delta {})",
            settings.initial_mode,
            settings.gesture.timeout_ms,
            settings.gesture.delta
        );

        Ok(Self {
            suspend,
            mode,
            dispatcher,
            wake,
            clock: MonotonicClock::new(),
            settle: settings.settle,
            workers: vec![wake_worker, detect_worker],
        })
    }

    /// Builds a fresh handler per input device, including devices that
    /// reconnect later.
    pub fn handler_factory(&self, filter: DeviceFilter) -> impl Fn() -> TouchHandler + Send + 'static {
        let dispatcher = self.dispatcher.clone();
        let clock = self.clock;
        move || TouchHandler::new(filter.clone(), dispatcher.clone(), clock)
    }

    pub fn on_suspend(&self) {
        self.suspend.on_suspend();
    }

    pub fn on_resume(&self) {
        self.suspend.on_resume();
    }

    pub fn is_suspended(&self) -> bool {
        self.suspend.is_suspended()
    }

    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    pub fn show_mode(&self) -> String {
        self.mode.show()
    }

    /// Write the mode switch.
    ///
    /// Changing the mode is only safe with the screen on, so a write that
    /// arrives while suspended first wakes the device and waits for the
    /// settle delay. The new value is applied only if the screen actually
    /// came back.
    pub fn store_mode(&self, buf: &str) -> Result<Mode, ModeError> {
        let mode = parse_written(buf)?;
        let current = self.mode.get();
        if current == mode {
            return Ok(mode);
        }

        if self.is_suspended() {
            log::info!("Mode change {} -> {} while suspended, waking first", current, mode);
            self.dispatcher.reset();
            self.wake.fire();
            thread::sleep(self.settle);
        }

        // Reported as an error rather than accepted and silently dropped.
        if self.is_suspended() {
            log::warn!("Screen did not resume, keeping mode {}", current);
            return Err(ModeError::StillSuspended(current));
        }

        self.mode.set(mode);
        log::info!("Mode set to {}", mode);
        Ok(mode)
    }

    /// Stop accepting work and let an in-flight power key sequence finish.
    /// Reader threads keep their own queue handles and end with the process.
    pub fn shutdown(self) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.wake.is_busy() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        let finished = self.workers.iter().filter(|w| w.is_finished()).count();
        log::info!(
            "Double tap service stopped (mode {}, {} of {} workers finished)",
            self.mode(),
            finished,
            self.workers.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputHandler, TouchEvent};
    use crate::suspend::SuspendFlag;
    use crate::wake::tests::{wait_idle, RecordingSink};

    /// Sink whose power key press brings the screen back, like the real
    /// power manager would.
    #[derive(Clone)]
    struct ResumingSink {
        inner: RecordingSink,
        suspend: SharedSuspendFlag,
    }

    impl KeySink for ResumingSink {
        fn emit_key(&mut self, code: u16, pressed: bool) -> io::Result<()> {
            if pressed {
                self.suspend.on_resume();
            }
            self.inner.emit_key(code, pressed)
        }

        fn emit_sync(&mut self) -> io::Result<()> {
            self.inner.emit_sync()
        }
    }

    fn settings() -> ServiceSettings {
        ServiceSettings {
            pwrkey_hold: Duration::from_millis(1),
            settle: Duration::from_millis(100),
            ..ServiceSettings::default()
        }
    }

    fn start_resuming() -> (Tap2Wake, RecordingSink) {
        let suspend: SharedSuspendFlag = Arc::new(SuspendFlag::new());
        let sink = ResumingSink {
            inner: RecordingSink::default(),
            suspend: suspend.clone(),
        };
        let recorded = sink.inner.clone();
        let service = Tap2Wake::start(settings(), suspend, sink).unwrap();
        (service, recorded)
    }

    #[test]
    fn test_store_while_awake_applies_without_wake() {
        let (service, sink) = start_resuming();
        assert_eq!(service.store_mode("2\n"), Ok(Mode::EnabledAlt));
        assert_eq!(service.mode(), Mode::EnabledAlt);
        assert_eq!(service.show_mode(), "2\n");
        wait_idle(&service.wake);
        assert_eq!(sink.presses(), 0);
    }

    #[test]
    fn test_store_while_suspended_wakes_once_then_applies() {
        let (service, sink) = start_resuming();
        service.on_suspend();

        let started = Instant::now();
        assert_eq!(service.store_mode("0"), Ok(Mode::Disabled));
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(service.mode(), Mode::Disabled);
        assert!(!service.is_suspended());

        wait_idle(&service.wake);
        assert_eq!(sink.presses(), 1);
    }

    #[test]
    fn test_store_same_value_is_a_no_op() {
        let (service, sink) = start_resuming();
        service.on_suspend();
        assert_eq!(service.store_mode("1"), Ok(Mode::Enabled));
        assert!(service.is_suspended());
        wait_idle(&service.wake);
        assert_eq!(sink.presses(), 0);
    }

    #[test]
    fn test_store_rejects_out_of_domain() {
        let (service, sink) = start_resuming();
        service.on_suspend();
        for bad in ["3", "-1", "on", "", " 2"] {
            assert_eq!(
                service.store_mode(bad),
                Err(ModeError::InvalidArgument(bad.to_string()))
            );
        }
        assert_eq!(service.mode(), Mode::Enabled);
        wait_idle(&service.wake);
        assert_eq!(sink.presses(), 0);
    }

    #[test]
    fn test_store_keeps_value_if_screen_stays_off() {
        let suspend: SharedSuspendFlag = Arc::new(SuspendFlag::new());
        let sink = RecordingSink::default();
        let service = Tap2Wake::start(settings(), suspend, sink.clone()).unwrap();
        service.on_suspend();

        assert_eq!(
            service.store_mode("2"),
            Err(ModeError::StillSuspended(Mode::Enabled))
        );
        assert_eq!(service.mode(), Mode::Enabled);
        wait_idle(&service.wake);
        assert_eq!(sink.presses(), 1);
    }

    #[test]
    fn test_handler_end_to_end() {
        let suspend: SharedSuspendFlag = Arc::new(SuspendFlag::new());
        let sink = RecordingSink::default();
        let service = Tap2Wake::start(settings(), suspend, sink.clone()).unwrap();
        service.on_suspend();

        let mut handler = service.handler_factory(DeviceFilter::default())();
        for (event, t) in [
            (TouchEvent::Slot(0), 0),
            (TouchEvent::TrackingId(1), 0),
            (TouchEvent::PositionX(300), 0),
            (TouchEvent::PositionY(300), 0),
            (TouchEvent::PositionX(320), 180),
            (TouchEvent::PositionY(310), 180),
        ] {
            handler.on_event_at(event, t);
        }
        handler.on_disconnect();

        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.presses() == 0 {
            assert!(Instant::now() < deadline, "double tap never woke");
            thread::sleep(Duration::from_millis(5));
        }
        wait_idle(&service.wake);
        assert_eq!(sink.presses(), 1);
        service.shutdown();
    }
}
