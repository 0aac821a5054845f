use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use sitetally::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::create_application_default_path,
        logging::{LogSettings, LogSource},
    },
};

fn main() -> Result<()> {
    let args = DaemonArgs::parse();
    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    LogSettings::new(LogSource::Tracker, &app_dir)
        .with_level(args.log)
        .with_console(args.log_console)
        .install()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(start_daemon(app_dir, Duration::from_secs(args.heartbeat_secs)));
    // A pending read on stdin would otherwise keep the process alive after a signal.
    runtime.shutdown_background();
    result
}
