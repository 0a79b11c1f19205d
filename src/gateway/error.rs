use duplex_session::LifecycleError;
use thiserror::Error;

/// Errors that can occur while running the gateway transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Failed to parse a channel announcement path.
    #[error("invalid channel path: {0}")]
    Path(String),

    /// Failed to create a broadcast for the reply channel.
    #[error("failed to create broadcast: {0}")]
    BroadcastCreate(String),

    /// Authorization failed for the requested operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An error from the underlying MoQ transport.
    #[error("MoQ error: {0}")]
    Transport(String),

    /// The session core rejected the connection.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
