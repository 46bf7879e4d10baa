//! Stream error types.

use super::lifecycle::RequestState;
use super::provider::ProviderError;

/// Errors returned to callers of the consolidation engine.
///
/// None of these are fatal to the stream itself: each leaves the engine in
/// a well-defined state that can be read back through its accessors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// A request is already in flight for this stream
    #[error("request rejected: stream is {0}")]
    ConcurrentRequestRejected(RequestState),

    /// Continuation needs a completed list to anchor on
    #[error("cannot extend: stream is {0}")]
    NotReady(RequestState),

    /// Continuation needs at least one element to anchor on
    #[error("cannot extend an empty list")]
    NothingToExtend,

    /// Abort only applies to an in-flight request
    #[error("nothing to abort: stream is {0}")]
    NotBusy(RequestState),

    /// The provider refused the request
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
