mod cli;
mod file;

pub use cli::{Cli, Command};

use std::path::PathBuf;
use std::time::Duration;

use crate::device::{DeviceFilter, DEFAULT_NAME_PATTERNS};
use crate::gesture::{GestureConfig, DEFAULT_DELTA, DEFAULT_TIMEOUT_MS};
use crate::mode::Mode;
use crate::service::{ServiceSettings, DEFAULT_SETTLE_MS};
use crate::suspend::DEFAULT_POLL_MS;
use crate::wake::DEFAULT_PWRKEY_MS;

pub const DEFAULT_SOCKET_PATH: &str = "/run/tap2wake.sock";

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub devices: Vec<PathBuf>,
    pub name_patterns: Vec<String>,
    pub dt2w: Option<String>,
    pub suspend_file: Option<PathBuf>,
    pub suspend_poll_ms: u64,
    pub socket_path: PathBuf,
    pub timeout_ms: u64,
    pub delta: i32,
    pub pwrkey_ms: u64,
    pub settle_ms: u64,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let file_config = cli
            .config
            .as_ref()
            .and_then(|p| file::load_from_path(p))
            .or_else(file::load_from_default_paths)
            .unwrap_or_default();

        Self::merge(cli, file_config)
    }

    fn merge(cli: &Cli, file_config: file::FileConfig) -> Self {
        let devices = if cli.devices.is_empty() {
            file_config.devices
        } else {
            cli.devices.clone()
        };
        let name_patterns = if !cli.name_patterns.is_empty() {
            cli.name_patterns.clone()
        } else if !file_config.name_patterns.is_empty() {
            file_config.name_patterns
        } else {
            DEFAULT_NAME_PATTERNS.iter().map(|p| p.to_string()).collect()
        };

        Self {
            devices: devices.into_iter().map(PathBuf::from).collect(),
            name_patterns,
            dt2w: cli.dt2w.clone().or(file_config.dt2w),
            suspend_file: cli.suspend_file.clone().or(file_config.suspend_file),
            suspend_poll_ms: cli
                .suspend_poll_ms
                .or(file_config.suspend_poll_ms)
                .unwrap_or(DEFAULT_POLL_MS),
            socket_path: cli
                .socket
                .clone()
                .or(file_config.socket_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH)),
            timeout_ms: cli
                .timeout_ms
                .or(file_config.timeout_ms)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
            delta: cli.delta.or(file_config.delta).unwrap_or(DEFAULT_DELTA),
            pwrkey_ms: cli
                .pwrkey_ms
                .or(file_config.pwrkey_ms)
                .unwrap_or(DEFAULT_PWRKEY_MS),
            settle_ms: file_config.settle_ms.unwrap_or(DEFAULT_SETTLE_MS),
        }
    }

    pub fn device_filter(&self) -> DeviceFilter {
        if self.devices.is_empty() {
            DeviceFilter::Names(self.name_patterns.clone())
        } else {
            DeviceFilter::Paths(self.devices.clone())
        }
    }

    pub fn initial_mode(&self) -> Mode {
        match self.dt2w.as_deref() {
            Some(param) => Mode::from_boot_param(param, Mode::default()),
            None => Mode::default(),
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            gesture: GestureConfig {
                timeout_ms: self.timeout_ms,
                delta: self.delta,
            },
            pwrkey_hold: Duration::from_millis(self.pwrkey_ms),
            settle: Duration::from_millis(self.settle_ms),
            initial_mode: self.initial_mode(),
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.delta <= 0 {
            return Err("delta must be positive");
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be positive");
        }
        if self.suspend_poll_ms == 0 {
            return Err("suspend_poll_ms must be positive");
        }
        if self.devices.is_empty() && self.name_patterns.iter().all(|p| p.is_empty()) {
            return Err("No device or name pattern to listen on");
        }
        Ok(())
    }
}
