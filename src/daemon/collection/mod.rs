//! Browser side of the tracker. A browser extension forwards tab, focus and idle changes as
//! [events::BrowserEvent]s, one JSON object per line.

pub mod events;
pub mod source;
