//! Small tracker of the time you spend on websites. A browser extension forwards tab, focus and
//! idle events to the tracker, which keeps a per-day total for every site. Totals can be
//! inspected from the terminal.
//!

pub mod cli;
pub mod daemon;
pub mod utils;
