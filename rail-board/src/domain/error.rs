//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from provider and stream errors.

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A record lacks the time data needed to place it
    #[error("missing required time data: {0}")]
    MissingTime(&'static str),

    /// A delay moves the time outside the representable range
    #[error("delay of {0}s is out of range")]
    DelayOutOfRange(i64),

    /// Route has no transfers
    #[error("route must have at least one transfer")]
    EmptyRoute,
}
