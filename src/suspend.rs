//! Screen suspend state shared between the notifier and the detection worker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_POLL_MS: u64 = 250;

/// Binary "screen is suspended" flag. Last write wins.
#[derive(Debug, Default)]
pub struct SuspendFlag {
    suspended: AtomicBool,
}

impl SuspendFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_suspend(&self) {
        self.suspended.store(true, Ordering::Release);
    }

    pub fn on_resume(&self) {
        self.suspended.store(false, Ordering::Release);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }
}

pub type SharedSuspendFlag = Arc<SuspendFlag>;

/// Interpret the contents of a framebuffer `blank` or backlight `bl_power`
/// file. Both use 0 for "unblanked"; every other level counts as suspended.
pub fn parse_blank_state(content: &str) -> Option<bool> {
    content.trim().parse::<u32>().ok().map(|level| level != 0)
}

/// Polls a sysfs blank file and pushes transitions into a `SuspendFlag`.
pub struct SuspendMonitor {
    path: PathBuf,
    interval: Duration,
    flag: SharedSuspendFlag,
}

impl SuspendMonitor {
    pub fn new(path: impl Into<PathBuf>, interval: Duration, flag: SharedSuspendFlag) -> Self {
        Self {
            path: path.into(),
            interval,
            flag,
        }
    }

    /// Spawn the poll thread. It runs until `stop` is set.
    pub fn spawn(self, stop: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("dt2w-suspend".into())
            .spawn(move || self.run(&stop))
    }

    fn run(self, stop: &AtomicBool) {
        log::info!(
            "Watching {} for screen blank (every {}ms)",
            self.path.display(),
            self.interval.as_millis()
        );

        let mut last: Option<bool> = None;
        let mut warned = false;

        while !stop.load(Ordering::Relaxed) {
            match read_blank_state(&self.path) {
                Some(suspended) => {
                    warned = false;
                    if last != Some(suspended) {
                        self.apply(suspended);
                        last = Some(suspended);
                    }
                }
                None if !warned => {
                    log::warn!("Cannot read blank state from {}", self.path.display());
                    warned = true;
                }
                None => {}
            }
            thread::sleep(self.interval);
        }

        log::debug!("Suspend monitor stopping");
    }

    fn apply(&self, suspended: bool) {
        if suspended {
            log::info!("Screen blanked, double tap armed");
            self.flag.on_suspend();
        } else {
            log::info!("Screen unblanked, double tap idle");
            self.flag.on_resume();
        }
    }
}

fn read_blank_state(path: &Path) -> Option<bool> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_blank_state(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_flag_last_write_wins() {
        let flag = SuspendFlag::new();
        assert!(!flag.is_suspended());
        flag.on_suspend();
        flag.on_suspend();
        assert!(flag.is_suspended());
        flag.on_resume();
        assert!(!flag.is_suspended());
    }

    #[test]
    fn test_parse_blank_state() {
        assert_eq!(parse_blank_state("0\n"), Some(false));
        assert_eq!(parse_blank_state("1\n"), Some(true));
        assert_eq!(parse_blank_state(" 4 "), Some(true));
        assert_eq!(parse_blank_state("off"), None);
        assert_eq!(parse_blank_state(""), None);
    }

    #[test]
    fn test_monitor_follows_file() {
        let path = std::env::temp_dir().join(format!("tap2wake-blank-{}", std::process::id()));
        std::fs::write(&path, "1\n").unwrap();

        let flag: SharedSuspendFlag = Arc::new(SuspendFlag::new());
        let stop = Arc::new(AtomicBool::new(false));
        let handle = SuspendMonitor::new(&path, Duration::from_millis(5), flag.clone())
            .spawn(stop.clone())
            .unwrap();

        let wait_for = |want: bool| {
            let deadline = Instant::now() + Duration::from_secs(5);
            while flag.is_suspended() != want {
                assert!(Instant::now() < deadline, "monitor never saw {}", want);
                thread::sleep(Duration::from_millis(5));
            }
        };

        wait_for(true);
        std::fs::write(&path, "0\n").unwrap();
        wait_for(false);

        stop.store(true, Ordering::Relaxed);
        handle.join().unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
