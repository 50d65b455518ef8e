//! Merge per-axis multi-touch updates into whole touch samples.
//!
//! Touch controllers report X and Y as separate ABS events, sometimes with
//! slot and tracking id changes interleaved. A sample is only produced once
//! both axes have been seen since the last sample or reset.

use crate::gesture::TouchSample;
use crate::input::TouchEvent;

/// What the caller should forward to the dispatch queue after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coalesced {
    /// Nothing to forward yet.
    Pending,
    /// A new slot started or the contact was lifted; gesture memory must be
    /// cleared.
    Reset,
    Sample(TouchSample),
}

/// Coordinates received for the current touch frame.
#[derive(Debug, Default, Clone, Copy)]
struct PendingCoordinates {
    x_received: bool,
    y_received: bool,
    x: i32,
    y: i32,
}

#[derive(Debug, Default)]
pub struct Coalescer {
    pending: PendingCoordinates,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one update stamped with the monotonic time in milliseconds.
    pub fn update(&mut self, event: TouchEvent, now_ms: u64) -> Coalesced {
        match event {
            TouchEvent::Slot(_) => {
                self.reset();
                return Coalesced::Reset;
            }
            TouchEvent::TrackingId(_) if event.is_lift() => {
                self.reset();
                return Coalesced::Reset;
            }
            TouchEvent::TrackingId(_) => return Coalesced::Pending,
            TouchEvent::PositionX(x) => {
                self.pending.x = x;
                self.pending.x_received = true;
            }
            TouchEvent::PositionY(y) => {
                self.pending.y = y;
                self.pending.y_received = true;
            }
        }

        if !(self.pending.x_received && self.pending.y_received) {
            return Coalesced::Pending;
        }

        self.pending.x_received = false;
        self.pending.y_received = false;
        Coalesced::Sample(TouchSample {
            x: self.pending.x,
            y: self.pending.y,
            timestamp: now_ms,
        })
    }

    pub fn reset(&mut self) {
        self.pending = PendingCoordinates::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(events: &[TouchEvent]) -> Vec<TouchSample> {
        let mut c = Coalescer::new();
        events
            .iter()
            .enumerate()
            .filter_map(|(t, &ev)| match c.update(ev, t as u64) {
                Coalesced::Sample(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_pair_emits_once() {
        let out = samples(&[TouchEvent::PositionX(10), TouchEvent::PositionY(20)]);
        assert_eq!(out, vec![TouchSample { x: 10, y: 20, timestamp: 1 }]);
    }

    #[test]
    fn test_lone_axis_emits_nothing() {
        assert!(samples(&[TouchEvent::PositionX(10)]).is_empty());
        assert!(samples(&[TouchEvent::PositionY(10), TouchEvent::PositionY(11)]).is_empty());
    }

    #[test]
    fn test_y_before_x_still_pairs() {
        let out = samples(&[TouchEvent::PositionY(5), TouchEvent::PositionX(6)]);
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].x, out[0].y), (6, 5));
    }

    #[test]
    fn test_each_completed_pair_emits() {
        let out = samples(&[
            TouchEvent::PositionX(1),
            TouchEvent::PositionY(1),
            TouchEvent::PositionX(2),
            TouchEvent::PositionX(3),
            TouchEvent::PositionY(2),
            TouchEvent::PositionY(9),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!((out[1].x, out[1].y), (3, 2));
    }

    #[test]
    fn test_slot_and_lift_clear_pending_axis() {
        let out = samples(&[
            TouchEvent::PositionX(1),
            TouchEvent::Slot(1),
            TouchEvent::PositionY(1),
        ]);
        assert!(out.is_empty());

        let out = samples(&[
            TouchEvent::PositionX(1),
            TouchEvent::TrackingId(-1),
            TouchEvent::PositionY(1),
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_reset_signals() {
        let mut c = Coalescer::new();
        assert_eq!(c.update(TouchEvent::Slot(0), 0), Coalesced::Reset);
        assert_eq!(c.update(TouchEvent::TrackingId(-1), 0), Coalesced::Reset);
        assert_eq!(c.update(TouchEvent::TrackingId(42), 0), Coalesced::Pending);
    }

    #[test]
    fn test_new_contact_keeps_pending_axis() {
        // A fresh tracking id is not a reset, so an X seen just before it
        // still pairs with the following Y.
        let out = samples(&[
            TouchEvent::PositionX(4),
            TouchEvent::TrackingId(3),
            TouchEvent::PositionY(8),
        ]);
        assert_eq!(out.len(), 1);
    }
}
