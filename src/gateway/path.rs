use duplex_session::{ChannelName, CorrelationId};

use crate::gateway::error::GatewayError;

/// A parsed channel announcement path: `{correlation_id}/{channel}`
///
/// Example: `eio-7f3a/control`
/// - `correlation_id`: `eio-7f3a`
/// - `channel`: `control`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPath {
    pub correlation_id: CorrelationId,
    pub channel: ChannelName,
}

impl ChannelPath {
    /// Parse a path string into a ChannelPath.
    ///
    /// The correlation id can contain slashes, so we split from the right.
    pub fn parse(path: &str) -> Result<Self, GatewayError> {
        let path = path.strip_prefix('/').unwrap_or(path);

        let (correlation_id, channel) = path.rsplit_once('/').ok_or_else(|| {
            GatewayError::Path(format!(
                "path must have a correlation id and a channel: '{path}'"
            ))
        })?;

        if correlation_id.is_empty() {
            return Err(GatewayError::Path(format!(
                "correlation id must be non-empty: '{path}'"
            )));
        }

        let channel = channel
            .parse::<ChannelName>()
            .map_err(|e| GatewayError::Path(format!("{e} in '{path}'")))?;

        Ok(ChannelPath {
            correlation_id: CorrelationId::from(correlation_id),
            channel,
        })
    }

    /// Returns the path in announcement form: `{correlation_id}/{channel}`
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.correlation_id, self.channel)
    }
}
