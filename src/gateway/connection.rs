use async_stream::stream;
use bytes::Bytes;
use dashmap::DashMap;
use duplex_session::{ChannelName, DeliveryError, ExternalConnectionId, Outbound};
use futures::Stream;
use moq_lite::{BroadcastConsumer, BroadcastProducer, Track, TrackConsumer, TrackProducer};
use serde::Serialize;
use serde_json::Value;
use std::pin::Pin;

use crate::gateway::error::GatewayError;

/// Event name of frames produced by [`Outbound::send`].
pub const MESSAGE_EVENT: &str = "message";

/// A stream of raw frames from one channel's MoQ track.
pub struct ChannelInbound {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>,
}

impl ChannelInbound {
    /// Create a new inbound stream from a broadcast consumer.
    pub fn new(broadcast: &BroadcastConsumer, track_name: &str) -> Self {
        let track = broadcast.subscribe_track(&Track::new(track_name));
        Self::from_track(track)
    }

    /// Create from an existing track consumer.
    pub fn from_track(mut track: TrackConsumer) -> Self {
        let inner = stream! {
            loop {
                match track.next_group().await {
                    Ok(Some(mut group)) => {
                        while let Ok(Some(frame)) = group.read_frame().await {
                            yield Ok(frame);
                        }
                    }
                    Ok(None) => {
                        // Track closed
                        break;
                    }
                    Err(e) => {
                        yield Err(GatewayError::Transport(e.to_string()));
                        break;
                    }
                }
            }
        };

        Self {
            inner: Box::pin(inner),
        }
    }
}

impl Stream for ChannelInbound {
    type Item = Result<Bytes, GatewayError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// JSON envelope of every frame the gateway writes back to a client.
#[derive(Debug, Serialize)]
pub struct OutboundFrame<'a> {
    pub event: &'a str,
    pub data: &'a Value,
}

impl OutboundFrame<'_> {
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// The reply side of one channel connection.
pub struct ChannelOutbound {
    // Dropping the broadcast closes it for the client.
    _broadcast: BroadcastProducer,
    track: TrackProducer,
}

impl ChannelOutbound {
    pub fn new(mut broadcast: BroadcastProducer, track_name: &str) -> Self {
        let track = broadcast.create_track(Track::new(track_name));
        Self {
            _broadcast: broadcast,
            track,
        }
    }

    /// Send raw bytes.
    pub fn send_raw(&mut self, bytes: impl Into<Bytes>) {
        self.track.write_frame(bytes.into());
    }
}

/// Reply sinks of every open channel connection.
#[derive(Default)]
pub struct ChannelSinks {
    sinks: DashMap<ExternalConnectionId, ChannelOutbound, ahash::RandomState>,
}

impl ChannelSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, connection: ExternalConnectionId, outbound: ChannelOutbound) {
        self.sinks.insert(connection, outbound);
    }

    pub fn remove(&self, connection: &ExternalConnectionId) -> bool {
        self.sinks.remove(connection).is_some()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn write(
        &self,
        connection: &ExternalConnectionId,
        frame: OutboundFrame<'_>,
    ) -> Result<(), DeliveryError> {
        let bytes = frame.encode()?;
        let mut sink = self
            .sinks
            .get_mut(connection)
            .ok_or_else(|| DeliveryError::Unreachable(connection.clone()))?;
        sink.send_raw(bytes);
        Ok(())
    }
}

// Connection ids are unique across channels, so the channel is only used for logging.
impl Outbound for ChannelSinks {
    fn send(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
        message: &str,
    ) -> Result<(), DeliveryError> {
        tracing::trace!(channel = %channel, connection = %connection, "Sending message");
        let data = Value::String(message.to_string());
        self.write(
            connection,
            OutboundFrame {
                event: MESSAGE_EVENT,
                data: &data,
            },
        )
    }

    fn emit(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
        event: &str,
        payload: &Value,
    ) -> Result<(), DeliveryError> {
        tracing::trace!(channel = %channel, connection = %connection, event, "Emitting event");
        self.write(
            connection,
            OutboundFrame {
                event,
                data: payload,
            },
        )
    }
}
