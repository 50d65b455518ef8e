//! The double-tap mode switch.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

pub const VERSION: &str = "1.7";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Disabled,
    #[default]
    Enabled,
    EnabledAlt,
}

impl Mode {
    pub fn as_u8(self) -> u8 {
        match self {
            Mode::Disabled => 0,
            Mode::Enabled => 1,
            Mode::EnabledAlt => 2,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Mode::Disabled),
            1 => Some(Mode::Enabled),
            2 => Some(Mode::EnabledAlt),
            _ => None,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Mode::Disabled
    }

    /// Resolve the boot-time `dt2w=` value. Only an exact "0", "1" or "2"
    /// is accepted; anything else keeps `default`.
    pub fn from_boot_param(param: &str, default: Mode) -> Mode {
        match param.parse::<Mode>() {
            Ok(mode) => {
                log::info!(
                    "DoubleTap2Wake {} (dt2w='{}')",
                    if mode.is_enabled() { "enabled" } else { "disabled" },
                    param
                );
                mode
            }
            Err(_) => {
                log::info!(
                    "No valid dt2w value '{}', going with default {}",
                    param,
                    default
                );
                default
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl FromStr for Mode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Mode::Disabled),
            "1" => Ok(Mode::Enabled),
            "2" => Ok(Mode::EnabledAlt),
            _ => Err(ModeError::InvalidArgument(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModeError {
    #[error("invalid argument '{0}': expected 0, 1 or 2")]
    InvalidArgument(String),

    #[error("screen is still suspended, mode left at {0}")]
    StillSuspended(Mode),
}

/// Parse a written value the way a sysfs attribute does: a single trailing
/// newline is ignored, nothing else is.
pub fn parse_written(buf: &str) -> Result<Mode, ModeError> {
    let value = buf.strip_suffix('\n').unwrap_or(buf);
    value
        .parse::<Mode>()
        .map_err(|_| ModeError::InvalidArgument(buf.to_string()))
}

/// Atomic holder for the current mode.
#[derive(Debug)]
pub struct ModeSwitch {
    value: AtomicU8,
}

impl ModeSwitch {
    pub fn new(mode: Mode) -> Self {
        Self {
            value: AtomicU8::new(mode.as_u8()),
        }
    }

    pub fn get(&self) -> Mode {
        Mode::from_u8(self.value.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn set(&self, mode: Mode) {
        self.value.store(mode.as_u8(), Ordering::Release);
    }

    /// Current value rendered like the sysfs attribute.
    pub fn show(&self) -> String {
        format!("{}\n", self.get())
    }
}

impl Default for ModeSwitch {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}
