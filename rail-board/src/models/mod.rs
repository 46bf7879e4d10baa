//! Presentation facades over consolidated streams.
//!
//! Each facade pins a stream to one record type and exposes the operations
//! a screen needs: start a query, page, abort, clear, and read back the
//! list with its lifecycle.

mod liveboard;
mod planner;

pub use liveboard::Liveboard;
pub use planner::RoutePlanner;
