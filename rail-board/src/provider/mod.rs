//! In-process providers serving boards and routes from JSON fixtures.
//!
//! These stand in for the routing engine: they answer requests with the
//! same event sequence a live engine produces and push corrections to
//! watched requests.

mod board;
mod error;
mod fixture;
mod params;
mod route;

pub use board::BoardFixtureProvider;
pub use error::FixtureError;
pub use fixture::{BoardFixture, load_boards, load_routes};
pub use params::{BoardRequest, RouteRequest};
pub use route::RouteFixtureProvider;
