//! Time accounting.
//!  - [record::SessionRecord] holds the open session and per-url totals of one day.
//!  - [reconcile::reconcile] is the heartbeat correction that keeps totals current and drops
//!    sleep gaps.
//!  - [aggregate] combines several days for reports.

pub mod aggregate;
pub mod reconcile;
pub mod record;
