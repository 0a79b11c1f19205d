use anyhow::Result;
use edge_gateway::duplex_session::{
    CommandProcessor, ControlCommand, CorrelationId, LogicalSession,
};
use edge_gateway::gateway::{GatewayConfig, GatewayServer};
use edge_gateway::{connect_bidirectional, init_tracing};
use std::sync::Arc;
use tracing::info;

/// Stand-in for the edge-computing pipeline: records what it would process.
struct LoggingProcessor;

impl CommandProcessor for LoggingProcessor {
    fn on_command(&self, session: &LogicalSession, command: &ControlCommand) {
        info!(
            correlation_id = %session.correlation_id(),
            command = %command.kind(),
            parameters = %serde_json::Value::Object(command.parameters().clone()),
            "Processing control command"
        );
    }

    fn on_client_departure(&self, session: &LogicalSession) {
        info!(correlation_id = %session.correlation_id(), "Releasing client resources");
    }

    fn on_data(&self, correlation_id: &CorrelationId, frame: &[u8]) {
        tracing::trace!(correlation_id = %correlation_id, size = frame.len(), "Data frame");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env();
    let url = config.relay_url();
    info!(relay = %url, max_message_size = config.max_message_size, "Gateway connecting");

    let (_session, producer, consumer) = connect_bidirectional(&url).await?;

    let server = GatewayServer::new(consumer, Arc::new(producer), LoggingProcessor, config);
    server.run().await?;

    Ok(())
}
