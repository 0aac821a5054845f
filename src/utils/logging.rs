use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

const LOG_DIR: &str = "logs";
const DEFAULT_LEVEL: LevelFilter = LevelFilter::DEBUG;
const KEPT_LOG_FILES: usize = 5;

/// Binary that writes the logs. The cli and the tracker share a directory but not files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Cli,
    Tracker,
}

impl LogSource {
    fn file_prefix(self) -> &'static str {
        match self {
            LogSource::Cli => "cli",
            LogSource::Tracker => "daemon",
        }
    }
}

#[derive(Debug)]
pub struct LogSettings {
    source: LogSource,
    dir: PathBuf,
    level: Option<LevelFilter>,
    console: bool,
}

impl LogSettings {
    /// Files go to `logs` inside the application directory. The level comes from `RUST_LOG`
    /// unless set explicitly.
    pub fn new(source: LogSource, app_dir: &Path) -> Self {
        Self {
            source,
            dir: app_dir.join(LOG_DIR),
            level: None,
            console: false,
        }
    }

    pub fn with_level(mut self, level: Option<LevelFilter>) -> Self {
        self.level = level;
        self
    }

    /// Mirrors logs to stderr. Stdout is never used, the tracker's host may be reading it.
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Installs the global subscriber: a daily rotated file plus the optional console.
    pub fn install(self) -> Result<()> {
        let appender = tracing_appender::rolling::Builder::new()
            .rotation(Rotation::DAILY)
            .max_log_files(KEPT_LOG_FILES)
            .filename_prefix(self.source.file_prefix())
            .build(&self.dir)
            .with_context(|| format!("Failed to open log directory {:?}", self.dir))?;

        let console = self.console;
        let stderr = std::io::stderr.with_filter(move |_| console);

        let directive = filter_directive(self.level, std::env::var("RUST_LOG").ok());
        let filter = EnvFilter::try_new(&directive)
            .or_else(|_| EnvFilter::try_new(filter_directive(Some(DEFAULT_LEVEL), None)))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(stderr.and(appender))
            .with_ansi(false)
            .init();
        Ok(())
    }
}

/// Only events of this crate are kept. An explicit level wins over the environment.
fn filter_directive(level: Option<LevelFilter>, env_level: Option<String>) -> String {
    let level = level
        .map(|v| v.to_string())
        .or(env_level.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());
    format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});
