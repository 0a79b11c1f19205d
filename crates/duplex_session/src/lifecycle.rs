use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::channel::{ChannelName, CorrelationId, ExternalConnectionId};
use crate::dispatch::{CommandDispatcher, DispatchResult, Outbound};
use crate::error::{LifecycleError, SessionError};
use crate::processor::CommandProcessor;
use crate::registry::ChannelRegistry;
use crate::session::{LogicalSession, SessionCorrelator};

/// Acknowledgment sent to every newly connected channel.
pub const CONNECTED_MESSAGE: &str = "you are connected";

/// What a disconnect event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The event referred to nothing live (late or duplicate delivery).
    Ignored,
    /// The channel detached; the other channel keeps the session alive.
    Detached(LogicalSession),
    /// The last channel detached and the session terminated.
    Departed(LogicalSession),
}

/// What an inbound message did.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// A CONTROL-channel payload went through the dispatcher.
    Command(DispatchResult),
    /// A DATA-channel frame was handed to the processor.
    DataForwarded,
    /// A DATA-channel frame from an unregistered connection was dropped.
    Ignored,
}

/// Entry point for transport events.
///
/// Owns the channel registry and the live-session set for one server. Create
/// one at server start and call [`drain`](Self::drain) at shutdown; nothing is
/// held in process-wide state, so independent instances never interfere.
pub struct ConnectionLifecycleManager<P, O> {
    registry: Arc<ChannelRegistry>,
    correlator: Arc<SessionCorrelator>,
    dispatcher: CommandDispatcher<P, O>,
    processor: Arc<P>,
    outbound: Arc<O>,
}

impl<P, O> ConnectionLifecycleManager<P, O>
where
    P: CommandProcessor,
    O: Outbound,
{
    pub fn new(processor: Arc<P>, outbound: Arc<O>) -> Self {
        let registry = Arc::new(ChannelRegistry::new());
        let correlator = Arc::new(SessionCorrelator::new());
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&correlator),
            Arc::clone(&processor),
            Arc::clone(&outbound),
        );
        Self {
            registry,
            correlator,
            dispatcher,
            processor,
            outbound,
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn correlator(&self) -> &SessionCorrelator {
        &self.correlator
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<P, O> {
        &self.dispatcher
    }

    /// A channel connection completed its handshake.
    ///
    /// A rejected connect leaves no trace in the registry or the session set.
    pub fn on_connect(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
        correlation_id: &CorrelationId,
    ) -> Result<LogicalSession, LifecycleError> {
        if let Err(e) = self.registry.register(channel, connection, correlation_id) {
            warn!(
                channel = %channel,
                connection = %connection,
                correlation_id = %correlation_id,
                error = %e,
                "Rejected channel registration"
            );
            return Err(e.into());
        }

        let session = match self.correlator.attach(correlation_id, channel, connection) {
            Ok(session) => session,
            Err(e) => {
                self.registry.unregister(channel, connection);
                warn!(
                    channel = %channel,
                    connection = %connection,
                    correlation_id = %correlation_id,
                    error = %e,
                    "Rejected channel attach"
                );
                return Err(e.into());
            }
        };

        info!(
            channel = %channel,
            connection = %connection,
            correlation_id = %correlation_id,
            state = %session.state(),
            "Channel connected"
        );

        if let Err(e) = self.outbound.send(channel, connection, CONNECTED_MESSAGE) {
            warn!(connection = %connection, error = %e, "Failed to acknowledge connect");
        }

        Ok(session)
    }

    /// A channel connection closed.
    ///
    /// Unknown connections and already-terminated sessions are expected under
    /// network races and are ignored.
    pub fn on_disconnect(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
    ) -> DisconnectOutcome {
        let Some(correlation_id) = self.registry.unregister(channel, connection) else {
            debug!(
                channel = %channel,
                connection = %connection,
                "Ignoring disconnect for unknown connection"
            );
            return DisconnectOutcome::Ignored;
        };

        let detached = match self
            .correlator
            .detach_connection(&correlation_id, channel, connection)
        {
            Ok(detached) => detached,
            Err(SessionError::SessionNotFound(_)) => {
                debug!(
                    channel = %channel,
                    correlation_id = %correlation_id,
                    "Ignoring disconnect for session that is already gone"
                );
                return DisconnectOutcome::Ignored;
            }
            Err(e) => {
                warn!(correlation_id = %correlation_id, error = %e, "Unexpected detach failure");
                return DisconnectOutcome::Ignored;
            }
        };

        if detached.terminated {
            info!(
                channel = %channel,
                correlation_id = %correlation_id,
                "Client departed"
            );
            self.processor.on_client_departure(&detached.session);
            DisconnectOutcome::Departed(detached.session)
        } else {
            info!(
                channel = %channel,
                correlation_id = %correlation_id,
                state = %detached.session.state(),
                "Channel disconnected"
            );
            DisconnectOutcome::Detached(detached.session)
        }
    }

    /// An inbound payload arrived on a channel connection.
    pub fn on_message(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
        raw: &[u8],
    ) -> MessageOutcome {
        let correlation_id = self.registry.resolve_correlation_id(channel, connection).ok();

        match channel {
            ChannelName::Control => {
                MessageOutcome::Command(self.dispatcher.handle(connection, correlation_id.as_ref(), raw))
            }
            ChannelName::Data => match correlation_id {
                Some(correlation_id) => {
                    self.processor.on_data(&correlation_id, raw);
                    MessageOutcome::DataForwarded
                }
                None => {
                    debug!(connection = %connection, "Dropping data frame from unknown connection");
                    MessageOutcome::Ignored
                }
            },
        }
    }

    /// Tear down every live session and forget every connection.
    ///
    /// Returns the number of sessions that departed.
    pub fn drain(&self) -> usize {
        let sessions = self.correlator.drain();
        for session in &sessions {
            self.processor.on_client_departure(session);
        }
        self.registry.clear();

        info!(sessions = sessions.len(), "Drained all sessions");
        sessions.len()
    }
}
