//! Domain types for live boards and itineraries.
//!
//! This module contains the value types that flow through the stream
//! consolidation engine. Identifier types enforce their invariants at
//! construction time; records mirror what the routing engine emits.

mod delay;
mod error;
mod route;
mod station;
mod stop;
mod time;

pub use delay::Delay;
pub use error::DomainError;
pub use route::{Route, Transfer, TransferKind};
pub use station::{InvalidStationId, StationId};
pub use stop::{OccupancyLevel, StopType, VehicleStop};
pub use time::{RailTime, TimeError};
