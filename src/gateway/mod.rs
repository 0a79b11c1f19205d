//! MoQ transport for the session core.
//!
//! Clients announce one broadcast per channel under the client prefix; the
//! gateway answers on a reply broadcast per channel under the response prefix.

mod config;
mod connection;
mod error;
mod path;
mod server;

pub use config::GatewayConfig;
pub use connection::{ChannelInbound, ChannelOutbound, ChannelSinks, MESSAGE_EVENT, OutboundFrame};
pub use error::GatewayError;
pub use path::ChannelPath;
pub use server::GatewayServer;
