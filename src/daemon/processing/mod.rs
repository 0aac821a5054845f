use std::time::Duration;

use anyhow::Result;
use module::EventProcessor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::utils::clock::Clock;

use super::collection::source::EventSource;

pub mod module;
pub mod tracker;

/// Event loop of the tracker. Browser events are handed to the processor as they arrive, and a
/// heartbeat fires every `heartbeat` in between, independent of events. The loop ends when the
/// event source runs dry or shutdown is requested, after which the processor is finalized.
pub struct TrackingModule<Source, Processor> {
    source: Source,
    processor: Processor,
    shutdown: CancellationToken,
    heartbeat: Duration,
    clock: Box<dyn Clock>,
}

impl<E: EventSource, P: EventProcessor> TrackingModule<E, P> {
    pub fn new(
        source: E,
        processor: P,
        shutdown: CancellationToken,
        heartbeat: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            source,
            processor,
            shutdown,
            heartbeat,
            clock,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut next_heartbeat = self.clock.instant() + self.heartbeat;
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = self.clock.sleep_until(next_heartbeat) => {
                    // Scheduled from the current instant, so a long suspend doesn't cause a burst
                    // of catch-up ticks.
                    next_heartbeat = self.clock.instant() + self.heartbeat;
                    if let Err(e) = self.processor.heartbeat().await {
                        error!("Heartbeat failed {e:?}");
                    }
                }
                event = self.source.next_event() => {
                    let Some(event) = event else {
                        info!("Browser disconnected");
                        break;
                    };
                    debug!("Processing event {:?}", event);
                    match self.processor.process_next(event.clone()).await {
                        Ok(_) => debug!("Processed event {:?}", event),
                        Err(e) => error!("Error processing event {:?}: {e:?}", event),
                    }
                }
            }
        }

        self.processor.finalize().await
    }
}
