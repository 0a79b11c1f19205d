//! Fakes for the processing hook and outbound delivery.

use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::channel::{ChannelName, CorrelationId, ExternalConnectionId};
use crate::command::ControlCommand;
use crate::dispatch::Outbound;
use crate::error::DeliveryError;
use crate::processor::CommandProcessor;
use crate::session::LogicalSession;

#[derive(Debug, Default)]
pub(crate) struct RecordingProcessor {
    commands: Mutex<Vec<(CorrelationId, String)>>,
    departures: Mutex<Vec<LogicalSession>>,
    frames: Mutex<Vec<(CorrelationId, Vec<u8>)>>,
}

impl RecordingProcessor {
    pub fn commands(&self) -> Vec<(CorrelationId, String)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn departures(&self) -> Vec<LogicalSession> {
        self.departures.lock().unwrap().clone()
    }

    pub fn departure_count(&self, correlation_id: &CorrelationId) -> usize {
        self.departures
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.correlation_id() == correlation_id)
            .count()
    }

    pub fn frames(&self) -> Vec<(CorrelationId, Vec<u8>)> {
        self.frames.lock().unwrap().clone()
    }
}

impl CommandProcessor for RecordingProcessor {
    fn on_command(&self, session: &LogicalSession, command: &ControlCommand) {
        self.commands
            .lock()
            .unwrap()
            .push((session.correlation_id().clone(), command.kind().to_string()));
    }

    fn on_client_departure(&self, session: &LogicalSession) {
        self.departures.lock().unwrap().push(session.clone());
    }

    fn on_data(&self, correlation_id: &CorrelationId, frame: &[u8]) {
        self.frames
            .lock()
            .unwrap()
            .push((correlation_id.clone(), frame.to_vec()));
    }
}

type Emitted = (ChannelName, ExternalConnectionId, String, Value);

#[derive(Debug, Default)]
pub(crate) struct RecordingOutbound {
    sent: Mutex<Vec<(ChannelName, ExternalConnectionId, String)>>,
    emitted: Mutex<Vec<Emitted>>,
    failing: AtomicBool,
}

impl RecordingOutbound {
    pub fn sent(&self) -> Vec<(ChannelName, ExternalConnectionId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn emitted(&self) -> Vec<Emitted> {
        self.emitted.lock().unwrap().clone()
    }

    /// Make every later delivery fail as if the connection were gone.
    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl Outbound for RecordingOutbound {
    fn send(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
        message: &str,
    ) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Unreachable(connection.clone()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel, connection.clone(), message.to_string()));
        Ok(())
    }

    fn emit(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
        event: &str,
        payload: &Value,
    ) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Unreachable(connection.clone()));
        }
        self.emitted.lock().unwrap().push((
            channel,
            connection.clone(),
            event.to_string(),
            payload.clone(),
        ));
        Ok(())
    }
}
