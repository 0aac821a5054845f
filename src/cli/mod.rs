pub mod manage;
pub mod output;
pub mod report;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use manage::{process_block_command, process_cleanup_command, process_status_command, BlockCommand};
use report::{process_average_command, process_report_command, AverageCommand, ReportCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{start_daemon, storage::file_store::FileStore},
    utils::{
        dir::{create_application_default_path, records_dir},
        logging::{LogSettings, LogSource},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Sitetally", version, long_about = None)]
#[command(about = "Tracks time spent on websites", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Run the tracker in current console. Browser events are read from stdin as JSON lines"
    )]
    Serve {
        #[arg(long = "heartbeat-secs", default_value_t = 120, value_parser = clap::value_parser!(u64).range(1..))]
        heartbeat_secs: u64,
    },
    #[command(about = "Display time spent per site over a range of days")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Display average time per day for every site")]
    Average {
        #[command(flatten)]
        command: AverageCommand,
    },
    #[command(about = "Show what is tracked right now")]
    Status,
    #[command(about = "Manage blocked sites")]
    Block {
        #[command(subcommand)]
        command: BlockCommand,
    },
    #[command(about = "Remove old day records")]
    Cleanup {
        #[arg(long = "retention-days", default_value_t = 30)]
        retention_days: u32,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => dir,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    LogSettings::new(LogSource::Cli, &app_dir)
        .with_level(logging_level)
        .with_console(args.log)
        .install()?;

    let open_store = || FileStore::new(records_dir(&app_dir));
    match args.commands {
        Commands::Serve { heartbeat_secs } => {
            start_daemon(
                app_dir.clone(),
                std::time::Duration::from_secs(heartbeat_secs),
            )
            .await
        }
        Commands::Report { command } => process_report_command(open_store()?, command).await,
        Commands::Average { command } => process_average_command(open_store()?, command).await,
        Commands::Status => process_status_command(open_store()?).await,
        Commands::Block { command } => process_block_command(open_store()?, command).await,
        Commands::Cleanup { retention_days } => {
            process_cleanup_command(open_store()?, retention_days).await
        }
    }
}
