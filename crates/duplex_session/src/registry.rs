use dashmap::DashMap;
use std::fmt;

use crate::channel::{ChannelName, CorrelationId, ExternalConnectionId};
use crate::error::RegistryError;

/// A composite key for connection tracking: (channel, connection).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub channel: ChannelName,
    pub connection: ExternalConnectionId,
}

impl ChannelKey {
    pub fn new(channel: ChannelName, connection: impl Into<ExternalConnectionId>) -> Self {
        Self {
            channel,
            connection: connection.into(),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.connection)
    }
}

/// Maps each channel connection to the correlation id of its client.
///
/// Entries for different connections live in independent shards, so
/// concurrent registrations for unrelated clients never contend on a single
/// lock.
#[derive(Debug)]
pub struct ChannelRegistry {
    connections: DashMap<ChannelKey, CorrelationId, ahash::RandomState>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::default(),
        }
    }

    /// Record that `connection` on `channel` belongs to `correlation_id`.
    ///
    /// Registering the same mapping twice succeeds. Registering a connection
    /// already mapped to a different correlation id fails.
    pub fn register(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
        correlation_id: &CorrelationId,
    ) -> Result<(), RegistryError> {
        use dashmap::mapref::entry::Entry;

        match self.connections.entry(ChannelKey::new(channel, connection.clone())) {
            Entry::Occupied(slot) if slot.get() == correlation_id => Ok(()),
            Entry::Occupied(slot) => Err(RegistryError::DuplicateRegistration {
                channel,
                connection: connection.clone(),
                existing: slot.get().clone(),
                requested: correlation_id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(correlation_id.clone());
                Ok(())
            }
        }
    }

    /// Find the correlation id of a registered connection.
    pub fn resolve_correlation_id(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
    ) -> Result<CorrelationId, RegistryError> {
        self.connections
            .get(&ChannelKey::new(channel, connection.clone()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::UnknownConnection {
                channel,
                connection: connection.clone(),
            })
    }

    /// Remove a mapping. Removing an absent mapping is a no-op.
    ///
    /// Returns the correlation id the connection was mapped to, if any.
    pub fn unregister(
        &self,
        channel: ChannelName,
        connection: &ExternalConnectionId,
    ) -> Option<CorrelationId> {
        self.connections
            .remove(&ChannelKey::new(channel, connection.clone()))
            .map(|(_, correlation_id)| correlation_id)
    }

    /// Check if a mapping exists for the connection.
    pub fn contains(&self, channel: ChannelName, connection: &ExternalConnectionId) -> bool {
        self.connections
            .contains_key(&ChannelKey::new(channel, connection.clone()))
    }

    /// Get the number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if there are no registered connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drop every mapping.
    pub fn clear(&self) {
        self.connections.clear();
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
