use async_trait::async_trait;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::mpsc,
};
use tracing::{debug, error, warn};

use super::events::BrowserEvent;

/// Contract for anything that delivers browser events to the tracker. Implementations must be
/// cancel safe, the tracker polls them together with its heartbeat.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSource: Send {
    /// Next event, or [None] once the browser side is gone.
    async fn next_event(&mut self) -> Option<BrowserEvent>;
}

/// Reads one JSON encoded [BrowserEvent] per line. Lines that don't parse are skipped.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl JsonLinesSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EventSource for JsonLinesSource<R> {
    async fn next_event(&mut self) -> Option<BrowserEvent> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Event stream ended");
                    return None;
                }
                Err(e) => {
                    error!("Failed to read events: {e:?}");
                    return None;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<BrowserEvent>(line) {
                Ok(event) => return Some(event),
                Err(e) => warn!("Skipping malformed event {line}: {e}"),
            }
        }
    }
}

#[async_trait]
impl EventSource for mpsc::Receiver<BrowserEvent> {
    async fn next_event(&mut self) -> Option<BrowserEvent> {
        self.recv().await
    }
}
