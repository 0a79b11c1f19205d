use std::str::FromStr;

const MEGABYTE: usize = 1024 * 1024;

/// Configuration for the gateway transport.
///
/// Everything here is consumed by the transport layer; the session core never
/// looks at it.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Relay host the gateway connects to.
    pub host: String,

    /// Relay port.
    pub port: u16,

    /// Prefix for client announcements (e.g., "client").
    /// Clients announce `{client_prefix}/{correlation_id}/{channel}`.
    pub client_prefix: String,

    /// Prefix for server replies (e.g., "server").
    /// Replies are published at `{response_prefix}/{correlation_id}/{channel}`.
    pub response_prefix: String,

    /// Track name carrying frames in both directions (e.g., "primary").
    pub track_name: String,

    /// Largest inbound frame accepted, in bytes. Larger frames are dropped.
    pub max_message_size: usize,

    /// Handle each control frame on its own task instead of serially per connection.
    pub async_handlers: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 4443,
            client_prefix: "client".to_string(),
            response_prefix: "server".to_string(),
            track_name: "primary".to_string(),
            max_message_size: 5 * MEGABYTE,
            async_handlers: true,
        }
    }
}

impl GatewayConfig {
    /// Build a config from `GATEWAY_*` environment variables, falling back to
    /// the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("GATEWAY_HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "GATEWAY_PORT").unwrap_or(defaults.port),
            max_message_size: parsed::<f64>(&lookup, "GATEWAY_MAX_MESSAGE_MB")
                .map(|mb| (mb * MEGABYTE as f64) as usize)
                .unwrap_or(defaults.max_message_size),
            async_handlers: parsed(&lookup, "GATEWAY_ASYNC_HANDLERS")
                .unwrap_or(defaults.async_handlers),
            ..defaults
        }
    }

    /// Set the relay host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the relay port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client prefix.
    pub fn with_client_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.client_prefix = prefix.into();
        self
    }

    /// Set the response prefix.
    pub fn with_response_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.response_prefix = prefix.into();
        self
    }

    /// Set the track name.
    pub fn with_track_name(mut self, name: impl Into<String>) -> Self {
        self.track_name = name.into();
        self
    }

    /// Set the maximum inbound frame size in bytes.
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Choose between per-frame tasks and serial handling.
    pub fn with_async_handlers(mut self, enabled: bool) -> Self {
        self.async_handlers = enabled;
        self
    }

    /// URL of the relay.
    pub fn relay_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }

    /// Path of the reply broadcast for one channel connection.
    pub(crate) fn response_path(&self, correlation_id: &str, channel: &str) -> String {
        format!("{}/{}/{}", self.response_prefix, correlation_id, channel)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}
