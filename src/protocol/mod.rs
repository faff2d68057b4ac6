//! MCP Protocol types (version 2025-11-25)

mod messages;
mod types;

pub use messages::*;
pub use types::*;

/// MCP Protocol version
pub const PROTOCOL_VERSION: &str = "2025-11-25";

/// Versions this server can speak, newest first
pub const SUPPORTED_VERSIONS: &[&str] = &["2025-11-25", "2025-06-18", "2025-03-26", "2024-11-05"];

/// Version to answer `initialize` with: the client's if supported, else ours
#[must_use]
pub fn negotiate_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| SUPPORTED_VERSIONS.iter().find(|s| **s == v).copied())
        .unwrap_or(PROTOCOL_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_negotiation() {
        assert_eq!(negotiate_version(Some("2025-03-26")), "2025-03-26");
        assert_eq!(negotiate_version(Some("1999-01-01")), PROTOCOL_VERSION);
        assert_eq!(negotiate_version(None), PROTOCOL_VERSION);
    }

    #[test]
    fn messages_split_on_id() {
        let request: JsonRpcMessage =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" })).unwrap();
        assert!(matches!(request, JsonRpcMessage::Request(_)));

        let notification: JsonRpcMessage = serde_json::from_value(
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        )
        .unwrap();
        assert!(matches!(notification, JsonRpcMessage::Notification(_)));
        assert_eq!(notification.method(), "notifications/initialized");

        let JsonRpcMessage::Request(call) = serde_json::from_str::<JsonRpcMessage>(
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"ratio":1.50,"big":123456789012345678901234}}"#,
        )
        .unwrap() else {
            panic!("expected a request");
        };
        assert_eq!(call.id, RequestId::Number(2));
        assert_eq!(
            serde_json::to_string(&call.params).unwrap(),
            r#"{"ratio":1.50,"big":123456789012345678901234}"#
        );
    }

    #[test]
    fn tool_result_wire_shape() {
        let result = ToolsCallResult::error("boom");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "content": [{ "type": "text", "text": "boom" }], "isError": true })
        );
    }
}
