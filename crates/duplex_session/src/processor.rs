use impl_trait_for_tuples::impl_for_tuples;

use crate::channel::CorrelationId;
use crate::command::ControlCommand;
use crate::session::LogicalSession;

/// Downstream processing driven by client sessions.
///
/// Hooks run after every session lock has been released, so a slow
/// implementation only delays the event that invoked it. Errors are the
/// implementation's own concern and are never reported to the client.
///
/// Tuples of processors are processors themselves; each hook is forwarded to
/// every element in order.
#[impl_for_tuples(5)]
pub trait CommandProcessor: Send + Sync {
    /// Called once per successfully dispatched command.
    fn on_command(&self, session: &LogicalSession, command: &ControlCommand);

    /// Called exactly once when a session terminates.
    fn on_client_departure(&self, session: &LogicalSession);

    /// Called for each DATA-channel frame of a registered connection.
    fn on_data(&self, _correlation_id: &CorrelationId, _frame: &[u8]) {}
}
