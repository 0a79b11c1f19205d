use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::CommandError;

/// Wire shape of a control payload. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RawCommand {
    command: String,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
}

/// A validated control instruction received on the CONTROL channel.
///
/// The only way to obtain one is through [`ControlCommand::parse`] or
/// [`ControlCommand::try_new`], both of which reject malformed input.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlCommand {
    kind: String,
    parameters: Map<String, Value>,
}

impl ControlCommand {
    /// Parse a JSON control payload such as `{"command": "start"}`.
    pub fn parse(raw: &[u8]) -> Result<Self, CommandError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| CommandError::Malformed(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validate an already-decoded payload.
    pub fn from_value(value: Value) -> Result<Self, CommandError> {
        if !value.is_object() {
            return Err(CommandError::Malformed(format!(
                "expected a JSON object, got {}",
                json_type_name(&value)
            )));
        }

        let raw: RawCommand =
            serde_json::from_value(value).map_err(|e| CommandError::Malformed(e.to_string()))?;
        Self::try_new(raw.command, raw.parameters.unwrap_or_default())
    }

    pub fn try_new(
        kind: impl Into<String>,
        parameters: Map<String, Value>,
    ) -> Result<Self, CommandError> {
        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(CommandError::Malformed(
                "field `command` must not be empty".to_string(),
            ));
        }
        Ok(Self { kind, parameters })
    }

    /// The command name understood by downstream processing.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_command() {
        let command = ControlCommand::parse(br#"{"command":"start"}"#).unwrap();
        assert_eq!(command.kind(), "start");
        assert!(command.parameters().is_empty());
    }

    #[test]
    fn test_parse_with_parameters() {
        let command =
            ControlCommand::parse(br#"{"command":"configure","parameters":{"fps":30,"roi":[0,0,640,480]}}"#)
                .unwrap();
        assert_eq!(command.kind(), "configure");
        assert_eq!(command.parameter("fps"), Some(&json!(30)));
        assert_eq!(command.parameter("roi"), Some(&json!([0, 0, 640, 480])));
        assert_eq!(command.parameter("missing"), None);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let command =
            ControlCommand::parse(br#"{"command":"stop","clear_all":true,"version":2}"#).unwrap();
        assert_eq!(command.kind(), "stop");
    }

    #[test]
    fn test_null_parameters_means_empty() {
        let command = ControlCommand::parse(br#"{"command":"stop","parameters":null}"#).unwrap();
        assert!(command.parameters().is_empty());
    }

    #[test]
    fn test_missing_command_rejected() {
        let err = ControlCommand::parse(br#"{"parameters":{}}"#).unwrap_err();
        let CommandError::Malformed(reason) = err;
        assert!(reason.contains("command"), "reason: {reason}");
    }

    #[test]
    fn test_wrong_field_types_rejected() {
        for payload in [
            json!({"command": 7}),
            json!({"command": null}),
            json!({"command": ["start"]}),
            json!({"command": "start", "parameters": [1, 2]}),
            json!({"command": "start", "parameters": "fps=30"}),
        ] {
            assert!(
                ControlCommand::from_value(payload.clone()).is_err(),
                "accepted {payload}"
            );
        }
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(ControlCommand::parse(br#"{"command":""}"#).is_err());
        assert!(ControlCommand::parse(br#"{"command":"   "}"#).is_err());
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let err = ControlCommand::parse(br#"["start"]"#).unwrap_err();
        assert_eq!(
            err,
            CommandError::Malformed("expected a JSON object, got an array".to_string())
        );
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = ControlCommand::parse(b"{command: start").unwrap_err();
        assert!(err.to_string().starts_with("Could not parse Control Command. invalid JSON"));
    }
}
