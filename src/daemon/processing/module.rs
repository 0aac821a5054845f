use anyhow::Result;

use crate::daemon::collection::events::BrowserEvent;

/// Represents a consumer of browser events. The tracking loop feeds it events as they arrive and
/// heartbeat ticks in between.
pub trait EventProcessor {
    fn process_next(&mut self, event: BrowserEvent) -> impl std::future::Future<Output = Result<()>>;

    fn heartbeat(&mut self) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
