use anyhow::{Result, anyhow};
use edge_gateway::duplex_session::ChannelName;
use edge_gateway::gateway::GatewayConfig;
use edge_gateway::{connect_bidirectional, init_tracing};
use moq_lite::{Track, TrackConsumer};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

/// Data frames sent before the client asks the gateway to stop.
const FRAMES_BEFORE_STOP: u64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env();
    let url = config.relay_url();
    let client_id = std::env::var("CLIENT_ID").unwrap_or_else(|_| Uuid::new_v4().to_string());

    let path = |prefix: &str, channel: ChannelName| format!("{prefix}/{client_id}/{channel}");
    let data_path = path(&config.client_prefix, ChannelName::Data);
    let control_path = path(&config.client_prefix, ChannelName::Control);
    let reply_path = path(&config.response_prefix, ChannelName::Control);

    info!(client_id = %client_id, relay = %url, "Client connecting");

    let (_session, producer, consumer) = connect_bidirectional(&url).await?;

    let mut data_broadcast = producer
        .create_broadcast(&data_path)
        .ok_or_else(|| anyhow!("failed to create data broadcast"))?;
    let mut data_track = data_broadcast.create_track(Track::new(&config.track_name));

    let mut control_broadcast = producer
        .create_broadcast(&control_path)
        .ok_or_else(|| anyhow!("failed to create control broadcast"))?;
    let mut control_track = control_broadcast.create_track(Track::new(&config.track_name));

    let reply_broadcast = consumer
        .consume_broadcast(&reply_path)
        .ok_or_else(|| anyhow!("failed to consume reply broadcast"))?;
    let mut replies = reply_broadcast.subscribe_track(&Track::new(&config.track_name));

    control_track.write_frame(serde_json::to_vec(&json!({
        "command": "start",
        "parameters": { "fps": 30 }
    }))?);
    // Rejected by the gateway with a control_cmd_error event.
    control_track.write_frame(serde_json::to_vec(&json!({ "parameters": {} }))?);

    let mut ticker = interval(Duration::from_millis(200));
    let mut sequence = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick(), if sequence < FRAMES_BEFORE_STOP => {
                data_track.write_frame(format!("frame-{sequence}").into_bytes());
                sequence += 1;
                if sequence == FRAMES_BEFORE_STOP {
                    control_track.write_frame(serde_json::to_vec(&json!({ "command": "stop" }))?);
                }
            }

            status = read_replies(&mut replies) => match status {
                ReplyStatus::Open => {}
                ReplyStatus::Closed => {
                    info!("Reply track closed");
                    break;
                }
                ReplyStatus::Failed(e) => {
                    // Expected until the gateway has created the reply broadcast.
                    warn!(error = %e, "Reply track error (will retry)");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    replies = reply_broadcast.subscribe_track(&Track::new(&config.track_name));
                }
            },
        }
    }

    Ok(())
}

enum ReplyStatus {
    Open,
    Closed,
    Failed(moq_lite::Error),
}

/// Log every frame of the next reply group.
async fn read_replies(track: &mut TrackConsumer) -> ReplyStatus {
    match track.next_group().await {
        Ok(Some(mut group)) => {
            while let Ok(Some(frame)) = group.read_frame().await {
                match serde_json::from_slice::<Value>(&frame) {
                    Ok(reply) => info!(event = %reply["event"], data = %reply["data"], "Reply"),
                    Err(e) => warn!(error = %e, "Undecodable reply"),
                }
            }
            ReplyStatus::Open
        }
        Ok(None) => ReplyStatus::Closed,
        Err(e) => ReplyStatus::Failed(e),
    }
}
