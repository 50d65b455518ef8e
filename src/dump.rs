//! Dump raw events from touch devices for debugging.
//! Run: tap2wake dump [/dev/input/eventN] to stream and print events.

use std::path::Path;
use std::thread;

use evdevil::Evdev;

use crate::device::{self, DeviceFilter, INPUT_DIR};
use crate::input::event::code_name;
use crate::input::DeviceInfo;

pub fn run_dump(
    device_path: Option<&str>,
    filter: &DeviceFilter,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let devices = match device_path {
        Some(path) => vec![device::open(Path::new(path))?],
        None => device::scan(Path::new(INPUT_DIR))?
            .into_iter()
            .filter(|(info, _)| filter.accepts(info))
            .collect(),
    };

    if devices.is_empty() {
        return Err("No matching touch device found".into());
    }

    let handles: Vec<_> = devices
        .into_iter()
        .map(|(info, evdev)| thread::spawn(move || dump_device(&info, &evdev)))
        .collect();

    for handle in handles {
        if let Ok(Err(e)) = handle.join() {
            log::error!("{}", e);
        }
    }
    Ok(())
}

fn dump_device(info: &DeviceInfo, evdev: &Evdev) -> std::io::Result<()> {
    eprintln!("Dumping events from {} ({}) (Ctrl+C to stop):\n", info.path.display(), info.name);
    let mut n = 0u64;
    for ev in evdev.raw_events() {
        let ev = ev?;
        n += 1;
        let name = code_name(ev.event_type().raw(), ev.raw_code());
        println!("{:6}  {}  {}  value={}", n, info.path.display(), name, ev.raw_value());
    }
    Ok(())
}
