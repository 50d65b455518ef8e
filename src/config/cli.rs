use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tap2wake")]
#[command(about = "Wake a suspended screen with a double tap on the touch panel")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Touch device node to listen on (repeatable, disables name matching)
    #[arg(long = "device")]
    pub devices: Vec<String>,

    /// Substring matched against input device names (repeatable)
    #[arg(long = "name-pattern")]
    pub name_patterns: Vec<String>,

    /// Initial mode: 0 (off), 1 or 2. Other values keep the default
    #[arg(long)]
    pub dt2w: Option<String>,

    /// Framebuffer blank or backlight bl_power file to watch for suspend
    #[arg(long)]
    pub suspend_file: Option<PathBuf>,

    /// Poll interval for the suspend file in milliseconds
    #[arg(long)]
    pub suspend_poll_ms: Option<u64>,

    /// Control socket path
    #[arg(long, env = "TAP2WAKE_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Maximum gap between the two taps in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Maximum distance between the two taps on each axis
    #[arg(long)]
    pub delta: Option<i32>,

    /// How long the synthetic power key is held, in milliseconds
    #[arg(long)]
    pub pwrkey_ms: Option<u64>,

    /// Path to config file
    #[arg(long, env = "TAP2WAKE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Dump raw touch events for debugging
    Dump {
        /// Device node to dump; defaults to every matching touch device
        device: Option<String>,
    },
    /// Print the current mode of a running daemon
    Get,
    /// Set the mode of a running daemon (0, 1 or 2)
    Set { value: String },
    /// Print the daemon version
    Version,
    /// Tell the daemon the screen was blanked
    Suspend,
    /// Tell the daemon the screen is back on
    Resume,
    /// Stop the daemon
    Quit,
}
