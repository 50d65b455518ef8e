use evdevil::event::{EventType, InputEvent};

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;
pub const SYN_REPORT: u16 = 0;

pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;

/// Tracking id value reported when a contact leaves the surface.
pub const TRACKING_ID_LIFTED: i32 = -1;

/// The multi-touch attribute updates the coalescer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEvent {
    Slot(i32),
    TrackingId(i32),
    PositionX(i32),
    PositionY(i32),
}

impl TouchEvent {
    /// Translate a raw evdev event. Anything that is not one of the four
    /// multi-touch ABS codes yields `None`.
    pub fn from_input(ev: &InputEvent) -> Option<Self> {
        if ev.event_type().raw() != EV_ABS {
            return None;
        }
        let value = ev.raw_value();
        match ev.raw_code() {
            ABS_MT_SLOT => Some(TouchEvent::Slot(value)),
            ABS_MT_TRACKING_ID => Some(TouchEvent::TrackingId(value)),
            ABS_MT_POSITION_X => Some(TouchEvent::PositionX(value)),
            ABS_MT_POSITION_Y => Some(TouchEvent::PositionY(value)),
            _ => None,
        }
    }

    pub fn is_lift(&self) -> bool {
        matches!(self, TouchEvent::TrackingId(TRACKING_ID_LIFTED))
    }
}

pub fn key_event(code: u16, value: i32) -> InputEvent {
    InputEvent::new(EventType::from_raw(EV_KEY), code, value)
}

/// Human readable name for the codes printed by `tap2wake dump`.
pub fn code_name(ty: u16, code: u16) -> String {
    match (ty, code) {
        (EV_SYN, SYN_REPORT) => "SYN_REPORT".into(),
        (EV_SYN, _) => format!("SYN/{}", code),
        (EV_KEY, _) => format!("KEY/{}", code),
        (EV_ABS, _) => {
            let abs = match code {
                0x00 => "X",
                0x01 => "Y",
                0x18 => "PRESSURE",
                0x30 => "MT_TOUCH_MAJOR",
                0x31 => "MT_TOUCH_MINOR",
                ABS_MT_SLOT => "MT_SLOT",
                ABS_MT_POSITION_X => "MT_POSITION_X",
                ABS_MT_POSITION_Y => "MT_POSITION_Y",
                0x37 => "MT_TOOL_TYPE",
                ABS_MT_TRACKING_ID => "MT_TRACKING_ID",
                0x3a => "MT_PRESSURE",
                _ => "?",
            };
            format!("ABS_{}({})", abs, code)
        }
        _ => format!("type{} code{}", ty, code),
    }
}
