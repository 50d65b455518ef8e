//! Double-tap recognition.

pub const DEFAULT_TIMEOUT_MS: u64 = 400;
pub const DEFAULT_DELTA: i32 = 160;

/// One coalesced touch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchSample {
    pub x: i32,
    pub y: i32,
    /// Monotonic milliseconds.
    pub timestamp: u64,
}

/// Time and distance windows for pairing two taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureConfig {
    pub timeout_ms: u64,
    pub delta: i32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            delta: DEFAULT_DELTA,
        }
    }
}

/// Outcome of feeding one sample to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Detection is gated off; state was not touched.
    Inactive,
    /// First tap recorded.
    Armed,
    /// The previous tap was too old; this one replaces it.
    TimedOut,
    /// Within the time window but too far away; this one replaces it.
    TooFar,
    DoubleTap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tap {
    x: i32,
    y: i32,
    time: u64,
}

/// Memory of the last tap. `None` is the unset state.
#[derive(Debug, Default)]
pub struct GestureState {
    last: Option<Tap>,
}

impl GestureState {
    /// Last tap position; the origin when unset.
    pub fn last_position(&self) -> (i32, i32) {
        self.last.map(|t| (t.x, t.y)).unwrap_or((0, 0))
    }

    pub fn last_time(&self) -> Option<u64> {
        self.last.map(|t| t.time)
    }

    fn record(&mut self, sample: &TouchSample) {
        self.last = Some(Tap {
            x: sample.x,
            y: sample.y,
            time: sample.timestamp,
        });
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[derive(Debug, Default)]
pub struct GestureDetector {
    config: GestureConfig,
    state: GestureState,
}

impl GestureDetector {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::default(),
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Feed one sample. `active` is false while the screen is on or the
    /// switch is disabled, in which case the sample is ignored entirely.
    pub fn detect(&mut self, sample: TouchSample, active: bool) -> Detection {
        if !active {
            return Detection::Inactive;
        }

        let Some(last) = self.state.last else {
            self.state.record(&sample);
            return Detection::Armed;
        };

        if sample.timestamp.saturating_sub(last.time) > self.config.timeout_ms {
            self.state.record(&sample);
            return Detection::TimedOut;
        }

        let delta = self.config.delta.max(0) as u32;
        let close = sample.x.abs_diff(last.x) < delta && sample.y.abs_diff(last.y) < delta;
        // A first tap at the origin matches any second tap. Kept as observed
        // on deployed devices; see test_origin_first_tap_matches_anywhere.
        let origin = last.x == 0 && last.y == 0;

        if close || origin {
            self.state.reset();
            Detection::DoubleTap
        } else {
            self.state.record(&sample);
            Detection::TooFar
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap(x: i32, y: i32, timestamp: u64) -> TouchSample {
        TouchSample { x, y, timestamp }
    }

    fn pair(first: TouchSample, second: TouchSample) -> Detection {
        let mut d = GestureDetector::default();
        assert_eq!(d.detect(first, true), Detection::Armed);
        d.detect(second, true)
    }

    #[test]
    fn test_timeout_boundary() {
        assert_eq!(pair(tap(100, 100, 0), tap(100, 100, 401)), Detection::TimedOut);
        assert_eq!(pair(tap(100, 100, 0), tap(100, 100, 399)), Detection::DoubleTap);
        assert_eq!(pair(tap(100, 100, 0), tap(100, 100, 400)), Detection::DoubleTap);
    }

    #[test]
    fn test_spatial_boundary() {
        assert_eq!(pair(tap(100, 100, 0), tap(261, 100, 100)), Detection::TooFar);
        assert_eq!(pair(tap(100, 100, 0), tap(260, 100, 100)), Detection::TooFar);
        assert_eq!(pair(tap(100, 100, 0), tap(259, 100, 100)), Detection::DoubleTap);
        assert_eq!(pair(tap(100, 100, 0), tap(100, 261, 100)), Detection::TooFar);
        assert_eq!(pair(tap(300, 300, 0), tap(141, 459, 100)), Detection::DoubleTap);
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        assert_eq!(
            pair(tap(-2_000_000_000, 0, 0), tap(2_000_000_000, 0, 10)),
            Detection::TooFar
        );
        assert_eq!(
            pair(tap(i32::MIN, i32::MAX, 0), tap(i32::MAX, i32::MIN, 10)),
            Detection::TooFar
        );
        assert_eq!(
            pair(tap(i32::MAX, i32::MAX, 0), tap(i32::MAX - 5, i32::MAX, 10)),
            Detection::DoubleTap
        );
    }

    #[test]
    fn test_origin_first_tap_matches_anywhere() {
        // Questionable but long-standing: a remembered tap at (0, 0) is
        // treated as a wildcard, so any second tap inside the window wakes.
        assert_eq!(pair(tap(0, 0, 0), tap(500, 500, 100)), Detection::DoubleTap);
        // The time window still applies.
        assert_eq!(pair(tap(0, 0, 0), tap(500, 500, 401)), Detection::TimedOut);
    }

    #[test]
    fn test_inactive_leaves_state_untouched() {
        let mut d = GestureDetector::default();
        assert_eq!(d.detect(tap(100, 100, 0), false), Detection::Inactive);
        assert_eq!(d.detect(tap(100, 100, 50), false), Detection::Inactive);
        assert_eq!(d.state().last_time(), None);

        assert_eq!(d.detect(tap(100, 100, 60), true), Detection::Armed);
        assert_eq!(d.detect(tap(100, 100, 90), false), Detection::Inactive);
        assert_eq!(d.state().last_time(), Some(60));
    }

    #[test]
    fn test_double_tap_resets_state() {
        let mut d = GestureDetector::default();
        d.detect(tap(10, 10, 0), true);
        assert_eq!(d.detect(tap(12, 12, 100), true), Detection::DoubleTap);
        assert_eq!(d.state().last_time(), None);
        assert_eq!(d.state().last_position(), (0, 0));
        // A third tap only arms again.
        assert_eq!(d.detect(tap(12, 12, 150), true), Detection::Armed);
    }

    #[test]
    fn test_rejected_tap_becomes_new_first_tap() {
        let mut d = GestureDetector::default();
        d.detect(tap(100, 100, 0), true);
        assert_eq!(d.detect(tap(900, 900, 100), true), Detection::TooFar);
        assert_eq!(d.state().last_position(), (900, 900));
        assert_eq!(d.detect(tap(910, 905, 250), true), Detection::DoubleTap);

        d.detect(tap(100, 100, 1000), true);
        assert_eq!(d.detect(tap(100, 100, 2000), true), Detection::TimedOut);
        assert_eq!(d.state().last_time(), Some(2000));
        assert_eq!(d.detect(tap(101, 99, 2300), true), Detection::DoubleTap);
    }

    #[test]
    fn test_reset_disarms() {
        let mut d = GestureDetector::default();
        d.detect(tap(100, 100, 0), true);
        d.reset();
        assert_eq!(d.detect(tap(100, 100, 50), true), Detection::Armed);
    }

    #[test]
    fn test_custom_thresholds() {
        let mut d = GestureDetector::new(GestureConfig {
            timeout_ms: 250,
            delta: 40,
        });
        d.detect(tap(100, 100, 0), true);
        assert_eq!(d.detect(tap(100, 100, 300), true), Detection::TimedOut);
        assert_eq!(d.detect(tap(150, 100, 400), true), Detection::TooFar);
        assert_eq!(d.detect(tap(160, 110, 500), true), Detection::DoubleTap);
    }
}
