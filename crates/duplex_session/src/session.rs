use dashmap::DashMap;
use std::fmt;

use crate::channel::{ChannelName, CorrelationId, ExternalConnectionId};
use crate::error::SessionError;

/// Lifecycle state of a [`LogicalSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created with exactly one channel attached; the pair has never been complete.
    Pending,
    /// Both channels attached.
    Active,
    /// One channel dropped after the pair was complete; the other is still up.
    Closing,
    /// Both channels gone. The session is no longer live.
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Pending => "pending",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// One client's relationship with the server across both of its channels.
///
/// Values handed out by [`SessionCorrelator`] are snapshots taken while the
/// session's lock was held; they do not track later changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalSession {
    correlation_id: CorrelationId,
    data: Option<ExternalConnectionId>,
    control: Option<ExternalConnectionId>,
    state: SessionState,
}

impl LogicalSession {
    fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            data: None,
            control: None,
            state: SessionState::Pending,
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The connection currently attached on `channel`, if any.
    pub fn connection(&self, channel: ChannelName) -> Option<&ExternalConnectionId> {
        match channel {
            ChannelName::Data => self.data.as_ref(),
            ChannelName::Control => self.control.as_ref(),
        }
    }

    pub fn is_attached(&self, channel: ChannelName) -> bool {
        self.connection(channel).is_some()
    }

    pub fn attached_channels(&self) -> Vec<ChannelName> {
        ChannelName::ALL
            .into_iter()
            .filter(|channel| self.is_attached(*channel))
            .collect()
    }

    fn slot_mut(&mut self, channel: ChannelName) -> &mut Option<ExternalConnectionId> {
        match channel {
            ChannelName::Data => &mut self.data,
            ChannelName::Control => &mut self.control,
        }
    }

    fn attach(
        &mut self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
    ) -> Result<(), SessionError> {
        if let Some(existing) = self.connection(channel) {
            if existing == connection {
                return Ok(());
            }
            return Err(SessionError::ChannelOccupied {
                correlation_id: self.correlation_id.clone(),
                channel,
                existing: existing.clone(),
            });
        }
        *self.slot_mut(channel) = Some(connection.clone());

        if self.data.is_some() && self.control.is_some() {
            self.state = SessionState::Active;
        }
        Ok(())
    }

    /// Clear the channel slot. With `expected` set, only a slot holding that
    /// connection is cleared. Returns whether anything changed.
    fn release(&mut self, channel: ChannelName, expected: Option<&ExternalConnectionId>) -> bool {
        let slot = self.slot_mut(channel);
        let matches = match (slot.as_ref(), expected) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(current), Some(expected)) => current == expected,
        };
        if !matches {
            return false;
        }
        *slot = None;

        self.state = match (self.data.is_some() || self.control.is_some(), self.state) {
            (false, _) => SessionState::Terminated,
            (true, SessionState::Active) => SessionState::Closing,
            (true, state) => state,
        };
        true
    }
}

/// Outcome of detaching a channel from a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    /// Session snapshot after the detach.
    pub session: LogicalSession,
    /// Channels still attached.
    pub remaining: Vec<ChannelName>,
    /// True only for the call that removed the session from the live set.
    pub terminated: bool,
}

/// The set of live sessions, keyed by correlation id.
///
/// Each mutation runs under the lock of the session's own shard, so unrelated
/// clients are not serialized behind one another.
#[derive(Debug)]
pub struct SessionCorrelator {
    sessions: DashMap<CorrelationId, LogicalSession, ahash::RandomState>,
}

impl SessionCorrelator {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::default(),
        }
    }

    /// Attach `connection` as the `channel` side of the session for
    /// `correlation_id`, creating the session if none is live.
    pub fn attach(
        &self,
        correlation_id: &CorrelationId,
        channel: ChannelName,
        connection: &ExternalConnectionId,
    ) -> Result<LogicalSession, SessionError> {
        use dashmap::mapref::entry::Entry;

        match self.sessions.entry(correlation_id.clone()) {
            Entry::Occupied(mut slot) => {
                let session = slot.get_mut();
                session.attach(channel, connection)?;
                Ok(session.clone())
            }
            Entry::Vacant(slot) => {
                let mut session = LogicalSession::new(correlation_id.clone());
                session.attach(channel, connection)?;
                let snapshot = session.clone();
                slot.insert(session);
                Ok(snapshot)
            }
        }
    }

    /// Detach whatever connection holds the `channel` side of the session.
    ///
    /// Detaching a channel that is not attached changes nothing.
    pub fn detach(
        &self,
        correlation_id: &CorrelationId,
        channel: ChannelName,
    ) -> Result<Detached, SessionError> {
        self.release(correlation_id, channel, None)
    }

    /// Like [`detach`](Self::detach), but only if `connection` is the one
    /// attached. A disconnect from an already replaced connection is a no-op.
    pub fn detach_connection(
        &self,
        correlation_id: &CorrelationId,
        channel: ChannelName,
        connection: &ExternalConnectionId,
    ) -> Result<Detached, SessionError> {
        self.release(correlation_id, channel, Some(connection))
    }

    fn release(
        &self,
        correlation_id: &CorrelationId,
        channel: ChannelName,
        expected: Option<&ExternalConnectionId>,
    ) -> Result<Detached, SessionError> {
        use dashmap::mapref::entry::Entry;

        match self.sessions.entry(correlation_id.clone()) {
            Entry::Vacant(_) => Err(SessionError::SessionNotFound(correlation_id.clone())),
            Entry::Occupied(mut slot) => {
                if !slot.get_mut().release(channel, expected) {
                    tracing::debug!(
                        correlation_id = %correlation_id,
                        channel = %channel,
                        "Detach left session unchanged"
                    );
                }
                let remaining = slot.get().attached_channels();
                if remaining.is_empty() {
                    let session = slot.remove();
                    Ok(Detached {
                        session,
                        remaining,
                        terminated: true,
                    })
                } else {
                    Ok(Detached {
                        session: slot.get().clone(),
                        remaining,
                        terminated: false,
                    })
                }
            }
        }
    }

    /// Snapshot of the live session for `correlation_id`.
    pub fn lookup(&self, correlation_id: &CorrelationId) -> Result<LogicalSession, SessionError> {
        self.sessions
            .get(correlation_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SessionError::SessionNotFound(correlation_id.clone()))
    }

    /// Check if a session is live for the given correlation id.
    pub fn contains(&self, correlation_id: &CorrelationId) -> bool {
        self.sessions.contains_key(correlation_id)
    }

    /// Get the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove every live session, returning them in the terminated state.
    pub fn drain(&self) -> Vec<LogicalSession> {
        let keys: Vec<CorrelationId> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        keys.into_iter()
            .filter_map(|key| self.sessions.remove(&key))
            .map(|(_, mut session)| {
                session.data = None;
                session.control = None;
                session.state = SessionState::Terminated;
                session
            })
            .collect()
    }
}

impl Default for SessionCorrelator {
    fn default() -> Self {
        Self::new()
    }
}
