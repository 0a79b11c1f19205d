//! Session correlation and control-command dispatch for dual-channel clients.
//!
//! A client opens two independent connections: a DATA channel carrying a
//! continuous stream and a CONTROL channel carrying discrete commands. This
//! crate correlates both into one [`LogicalSession`], validates and routes
//! control commands to downstream processing, and coordinates teardown when
//! either channel drops.
//!
//! The crate owns no network listener. A transport substrate feeds it
//! connect/message/disconnect events through [`ConnectionLifecycleManager`]
//! and delivers its replies through an [`Outbound`] implementation.

mod channel;
mod command;
mod dispatch;
mod error;
mod lifecycle;
mod processor;
mod registry;
mod session;

#[cfg(test)]
mod testing;

pub use channel::{ChannelName, CorrelationId, ExternalConnectionId};
pub use command::ControlCommand;
pub use dispatch::{
    COMMAND_ERROR_EVENT, CommandDispatcher, DispatchResult, NO_SESSION_REASON, Outbound,
};
pub use error::{CommandError, DeliveryError, LifecycleError, RegistryError, SessionError};
pub use lifecycle::{CONNECTED_MESSAGE, ConnectionLifecycleManager, DisconnectOutcome, MessageOutcome};
pub use processor::CommandProcessor;
pub use registry::{ChannelKey, ChannelRegistry};
pub use session::{Detached, LogicalSession, SessionCorrelator, SessionState};
