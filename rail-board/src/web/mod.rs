//! Web layer for the liveboard and route planner.
//!
//! Exposes both consolidated streams over JSON endpoints: start a request,
//! page it, abort it, and read the current list with its lifecycle.

mod dto;
mod error;
mod routes;
mod state;

pub use dto::*;
pub use error::AppError;
pub use routes::create_router;
pub use state::{AppState, BoardModel, PlannerModel};
