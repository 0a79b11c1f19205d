use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use crate::channel::{ChannelName, CorrelationId, ExternalConnectionId};
use crate::command::ControlCommand;
use crate::error::{CommandError, DeliveryError};
use crate::processor::CommandProcessor;
use crate::session::SessionCorrelator;

/// Event name used to report a rejected control message to its sender.
pub const COMMAND_ERROR_EVENT: &str = "control_cmd_error";

/// Reason reported for a valid command that has no live session behind it.
pub const NO_SESSION_REASON: &str = "No active session for this connection";

/// Outbound delivery primitives supplied by the transport.
pub trait Outbound: Send + Sync {
    /// Send a plain message to one connection.
    fn send(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
        message: &str,
    ) -> Result<(), DeliveryError>;

    /// Emit a named event with a structured payload to one connection.
    fn emit(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
        event: &str,
        payload: &Value,
    ) -> Result<(), DeliveryError>;
}

/// What happened to one inbound control message.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    /// The processing hook received the command.
    Delivered(CorrelationId),
    /// The payload was rejected before any session lookup.
    Malformed(CommandError),
    /// The command was valid but no live session owns the connection.
    SessionNotFound,
}

impl DispatchResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchResult::Delivered(_))
    }
}

/// Validates control payloads and routes them to the owning session's processor.
pub struct CommandDispatcher<P, O> {
    correlator: Arc<SessionCorrelator>,
    processor: Arc<P>,
    outbound: Arc<O>,
}

impl<P, O> CommandDispatcher<P, O>
where
    P: CommandProcessor,
    O: Outbound,
{
    pub fn new(correlator: Arc<SessionCorrelator>, processor: Arc<P>, outbound: Arc<O>) -> Self {
        Self {
            correlator,
            processor,
            outbound,
        }
    }

    pub fn parse(&self, raw: &[u8]) -> Result<ControlCommand, CommandError> {
        ControlCommand::parse(raw)
    }

    /// Hand `command` to the processor of the session for `correlation_id`.
    ///
    /// The session snapshot is taken and its lock released before the hook runs.
    pub fn dispatch(&self, command: &ControlCommand, correlation_id: &CorrelationId) -> DispatchResult {
        let session = match self.correlator.lookup(correlation_id) {
            Ok(session) => session,
            Err(_) => return DispatchResult::SessionNotFound,
        };

        info!(
            correlation_id = %correlation_id,
            command = %command.kind(),
            state = %session.state(),
            "Dispatching control command"
        );
        self.processor.on_command(&session, command);
        DispatchResult::Delivered(correlation_id.clone())
    }

    /// Full handling of one inbound control payload from `origin`.
    ///
    /// Parsing happens before the session is resolved, so a malformed payload
    /// is reported as malformed even on a connection with no session. Every
    /// non-delivered outcome emits exactly one error event to `origin`.
    pub fn handle(
        &self,
        origin: &ExternalConnectionId,
        correlation_id: Option<&CorrelationId>,
        raw: &[u8],
    ) -> DispatchResult {
        let command = match self.parse(raw) {
            Ok(command) => command,
            Err(e) => {
                warn!(connection = %origin, error = %e, "Rejected control command");
                self.report(origin, &e.to_string());
                return DispatchResult::Malformed(e);
            }
        };

        let result = match correlation_id {
            Some(correlation_id) => self.dispatch(&command, correlation_id),
            None => DispatchResult::SessionNotFound,
        };

        if result == DispatchResult::SessionNotFound {
            warn!(
                connection = %origin,
                command = %command.kind(),
                "Control command for connection without a live session"
            );
            self.report(origin, NO_SESSION_REASON);
        }
        result
    }

    fn report(&self, origin: &ExternalConnectionId, reason: &str) {
        let payload = json!({ "error": reason });
        if let Err(e) =
            self.outbound
                .emit(ChannelName::Control, origin, COMMAND_ERROR_EVENT, &payload)
        {
            warn!(connection = %origin, error = %e, "Failed to report command error");
        }
    }
}
