use thiserror::Error;

use crate::channel::{ChannelName, CorrelationId, ExternalConnectionId};

/// Errors raised by the channel registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The connection is already mapped to another correlation id.
    #[error(
        "connection '{connection}' on {channel} is already registered to '{existing}', \
         refusing '{requested}'"
    )]
    DuplicateRegistration {
        channel: ChannelName,
        connection: ExternalConnectionId,
        existing: CorrelationId,
        requested: CorrelationId,
    },

    /// No mapping exists for the connection.
    #[error("unknown connection '{connection}' on {channel}")]
    UnknownConnection {
        channel: ChannelName,
        connection: ExternalConnectionId,
    },
}

/// Errors raised by the session correlator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// No live session exists for the correlation id.
    #[error("no live session for '{0}'")]
    SessionNotFound(CorrelationId),

    /// The channel slot of the session is held by a different connection.
    #[error("{channel} channel of '{correlation_id}' is already attached to '{existing}'")]
    ChannelOccupied {
        correlation_id: CorrelationId,
        channel: ChannelName,
        existing: ExternalConnectionId,
    },
}

/// Errors raised while parsing a control payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CommandError {
    /// The payload is not a well-formed control command.
    #[error("Could not parse Control Command. {0}")]
    Malformed(String),
}

/// Errors raised by an [`Outbound`](crate::Outbound) implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeliveryError {
    /// The target connection has no open sink.
    #[error("connection '{0}' is not reachable")]
    Unreachable(ExternalConnectionId),

    /// The payload could not be encoded.
    #[error("failed to encode outbound payload")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while handling a channel connect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LifecycleError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
