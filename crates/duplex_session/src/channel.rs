use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// The logical role a client connection serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelName {
    /// Continuous stream payloads. Not interpreted by this crate.
    Data,
    /// Discrete control commands.
    Control,
}

impl ChannelName {
    pub const ALL: [ChannelName; 2] = [ChannelName::Data, ChannelName::Control];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelName::Data => "data",
            ChannelName::Control => "control",
        }
    }

    /// The paired channel.
    pub fn other(&self) -> ChannelName {
        match self {
            ChannelName::Data => ChannelName::Control,
            ChannelName::Control => ChannelName::Data,
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(ChannelName::Data),
            "control" => Ok(ChannelName::Control),
            other => Err(format!("unknown channel '{other}'")),
        }
    }
}

/// Identifier the transport assigns to one physical channel connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalConnectionId(String);

impl ExternalConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random connection id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExternalConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ExternalConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Key shared by the DATA and CONTROL connections of one client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_parse() {
        assert_eq!("data".parse::<ChannelName>(), Ok(ChannelName::Data));
        assert_eq!("control".parse::<ChannelName>(), Ok(ChannelName::Control));
        assert!("Control".parse::<ChannelName>().is_err());
        assert!("".parse::<ChannelName>().is_err());
    }

    #[test]
    fn test_channel_other() {
        assert_eq!(ChannelName::Data.other(), ChannelName::Control);
        assert_eq!(ChannelName::Control.other(), ChannelName::Data);
    }

    #[test]
    fn test_generated_connection_ids_are_unique() {
        let a = ExternalConnectionId::generate();
        let b = ExternalConnectionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
