pub mod event;
mod handler;

pub use event::TouchEvent;
pub use handler::{DeviceInfo, InputHandler, MonotonicClock, TouchHandler};
