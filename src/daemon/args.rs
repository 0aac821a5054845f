use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "sitetally-daemon", version)]
#[command(about = "Tracks the active website from browser events read on stdin")]
pub struct DaemonArgs {
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Seconds between heartbeat checks.
    #[arg(long = "heartbeat-secs", default_value_t = 120, value_parser = clap::value_parser!(u64).range(1..))]
    pub heartbeat_secs: u64,
    /// This option is for debugging purposes only. Logs are written to stderr.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}
