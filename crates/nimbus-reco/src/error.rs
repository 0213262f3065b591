//! Error taxonomy for the recognition-engine adapter

use thiserror::Error;

/// Errors surfaced to the caller of the adapter's synchronous entry points.
///
/// Asynchronous failures (transport errors, service rejections) never appear
/// here; they arrive as [`ServiceEvent::Error`](crate::events::ServiceEvent)
/// and are routed to the site's `error` callback.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("adapter already initialized")]
    AlreadyInitialized,

    #[error("adapter not initialized")]
    Uninitialized,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("site failure: {0}")]
    SiteFailure(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}
