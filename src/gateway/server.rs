use dashmap::DashMap;
use duplex_session::{
    ChannelName, CommandProcessor, ConnectionLifecycleManager, ExternalConnectionId,
};
use futures::StreamExt;
use moq_lite::{BroadcastConsumer, OriginConsumer, OriginProducer};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::gateway::config::GatewayConfig;
use crate::gateway::connection::{ChannelInbound, ChannelOutbound, ChannelSinks};
use crate::gateway::error::GatewayError;
use crate::gateway::path::ChannelPath;

type Lifecycle<P> = ConnectionLifecycleManager<P, ChannelSinks>;

/// Bridges MoQ channel announcements to the session core.
///
/// Every announced `{correlation_id}/{channel}` broadcast is one channel
/// connection; its withdrawal is the matching disconnect.
pub struct GatewayServer<P> {
    consumer: OriginConsumer,
    bridge: Bridge<P>,
}

/// Per-connection state shared by the announcement handlers.
struct Bridge<P> {
    producer: Arc<OriginProducer>,
    lifecycle: Arc<Lifecycle<P>>,
    sinks: Arc<ChannelSinks>,
    // Announcement path -> connection id assigned to it.
    connections: DashMap<String, ExternalConnectionId, ahash::RandomState>,
    config: GatewayConfig,
}

impl<P> GatewayServer<P>
where
    P: CommandProcessor + 'static,
{
    /// Create a new gateway server.
    pub fn new(
        consumer: OriginConsumer,
        producer: Arc<OriginProducer>,
        processor: P,
        config: GatewayConfig,
    ) -> Self {
        let sinks = Arc::new(ChannelSinks::new());
        let lifecycle = Arc::new(ConnectionLifecycleManager::new(
            Arc::new(processor),
            Arc::clone(&sinks),
        ));
        Self {
            consumer,
            bridge: Bridge {
                producer,
                lifecycle,
                sinks,
                connections: DashMap::default(),
                config,
            },
        }
    }

    /// Get the number of live client sessions.
    pub fn active_sessions(&self) -> usize {
        self.bridge.lifecycle.correlator().len()
    }

    /// Get the number of open channel connections.
    pub fn open_connections(&self) -> usize {
        self.bridge.sinks.len()
    }

    /// Run the gateway until the announcement stream closes.
    ///
    /// Per-connection failures are logged and never stop the loop. When the
    /// stream closes every remaining session is torn down.
    pub async fn run(self) -> Result<(), GatewayError> {
        let Self { consumer, bridge } = self;

        let prefix = bridge.config.client_prefix.clone();
        let mut announcements = consumer.with_root(&prefix).ok_or_else(|| {
            GatewayError::Unauthorized(format!("prefix '{prefix}' not authorized"))
        })?;

        info!(prefix = %prefix, "Gateway started, listening for announcements");

        loop {
            match announcements.announced().await {
                Some((path, Some(broadcast))) => {
                    let path_str = path.to_string();
                    debug!(path = %path_str, "Received announcement");

                    if let Err(e) = bridge.handle_announcement(&path_str, broadcast) {
                        warn!(path = %path_str, error = %e, "Failed to handle announcement");
                    }
                }

                Some((path, None)) => {
                    bridge.handle_withdrawal(&path.to_string());
                }

                None => {
                    info!("Announcement stream closed, gateway shutting down");
                    break;
                }
            }
        }

        bridge.connections.clear();
        bridge.lifecycle.drain();
        Ok(())
    }
}

impl<P> Bridge<P>
where
    P: CommandProcessor + 'static,
{
    /// Handle a new channel announcement.
    fn handle_announcement(
        &self,
        path: &str,
        broadcast: BroadcastConsumer,
    ) -> Result<(), GatewayError> {
        let ChannelPath {
            correlation_id,
            channel,
        } = ChannelPath::parse(path)?;
        let connection = ExternalConnectionId::generate();

        // The reply sink must exist before the connect so the acknowledgment can be delivered.
        let response_path = self
            .config
            .response_path(correlation_id.as_str(), channel.as_str());
        let response_broadcast = self
            .producer
            .create_broadcast(&response_path)
            .ok_or_else(|| {
                GatewayError::BroadcastCreate(format!(
                    "failed to create reply broadcast at '{response_path}'"
                ))
            })?;
        self.sinks.insert(
            connection.clone(),
            ChannelOutbound::new(response_broadcast, &self.config.track_name),
        );

        if let Err(e) = self.lifecycle.on_connect(channel, &connection, &correlation_id) {
            self.sinks.remove(&connection);
            return Err(e.into());
        }
        self.connections.insert(path.to_string(), connection.clone());

        info!(
            correlation_id = %correlation_id,
            channel = %channel,
            connection = %connection,
            response_path = %response_path,
            "Spawning reader for new connection"
        );

        let inbound = ChannelInbound::new(&broadcast, &self.config.track_name);
        spawn_reader(
            Arc::clone(&self.lifecycle),
            channel,
            connection,
            inbound,
            self.config.max_message_size,
            self.config.async_handlers,
        );

        Ok(())
    }

    /// Handle a withdrawn channel announcement.
    fn handle_withdrawal(&self, path: &str) {
        let Some((_, connection)) = self.connections.remove(path) else {
            debug!(path = %path, "Withdrawal for unknown path");
            return;
        };

        match ChannelPath::parse(path) {
            Ok(ChannelPath { channel, .. }) => {
                let outcome = self.lifecycle.on_disconnect(channel, &connection);
                debug!(path = %path, outcome = ?outcome, "Channel withdrawn");
            }
            Err(e) => warn!(path = %path, error = %e, "Withdrawal for unparsable path"),
        }
        self.sinks.remove(&connection);
    }
}

fn spawn_reader<P>(
    lifecycle: Arc<Lifecycle<P>>,
    channel: ChannelName,
    connection: ExternalConnectionId,
    mut inbound: ChannelInbound,
    max_message_size: usize,
    async_handlers: bool,
) where
    P: CommandProcessor + 'static,
{
    tokio::spawn(async move {
        while let Some(result) = inbound.next().await {
            let frame = match result {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(connection = %connection, error = %e, "Inbound stream error");
                    break;
                }
            };

            if frame.len() > max_message_size {
                warn!(
                    connection = %connection,
                    size = frame.len(),
                    limit = max_message_size,
                    "Dropping oversized frame"
                );
                continue;
            }

            if async_handlers {
                let lifecycle = Arc::clone(&lifecycle);
                let connection = connection.clone();
                tokio::spawn(async move {
                    lifecycle.on_message(channel, &connection, &frame);
                });
            } else {
                lifecycle.on_message(channel, &connection, &frame);
            }
        }

        debug!(connection = %connection, "Reader completed");
    });
}
