use std::fmt;

use serde::{Deserialize, Serialize};

/// Inbound OneBot event as delivered over the gateway socket.
///
/// Only the fields the relay looks at are modelled; everything else in the
/// frame is ignored. Every field is optional so that heartbeat and lifecycle
/// frames still decode and simply classify as noise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayEvent {
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub anonymous: Option<serde_json::Value>,
    #[serde(default)]
    pub raw_message: Option<String>,
    #[serde(default)]
    pub sender: Option<GatewaySender>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewaySender {
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EventKind {
    Message,
    Other,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScopeKind {
    Group,
    Private,
    Other,
}

impl GatewayEvent {
    pub fn event_kind(&self) -> EventKind {
        match self.post_type.as_deref() {
            Some("message") => EventKind::Message,
            _ => EventKind::Other,
        }
    }

    pub fn scope_kind(&self) -> ScopeKind {
        match self.message_type.as_deref() {
            Some("group") => ScopeKind::Group,
            Some("private") => ScopeKind::Private,
            _ => ScopeKind::Other,
        }
    }

    /// OneBot sends `"anonymous": null` for regular members.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous.is_some()
    }

    pub fn raw_text(&self) -> &str {
        self.raw_message.as_deref().unwrap_or_default()
    }

    /// Group card name when set, otherwise the account nickname.
    pub fn sender_display_name(&self) -> String {
        let Some(sender) = &self.sender else {
            return String::new();
        };

        match sender.card.as_deref() {
            Some(card) if !card.is_empty() => card.to_string(),
            _ => sender.nickname.clone().unwrap_or_default(),
        }
    }
}

/// Classified meaning of an inbound gateway event.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Intent {
    Help,
    Ping,
    Info,
    Online,
    Stats { args: Vec<String>, wants_bot: bool },
    Chat { text: String, sender: String },
    Ignore,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommandRequest {
    pub target_client: String,
    pub command: String,
    pub awaits_response: bool,
}

/// Chat line received from the internal network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub message: String,
}

impl ChatPayload {
    pub fn new(author: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            message: message.into(),
        }
    }

    pub fn formatted(&self) -> String {
        if self.author.is_empty() {
            self.message.clone()
        } else {
            format!("<{}> {}", self.author, self.message)
        }
    }
}

/// Command request/response envelope travelling over the internal network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandPayload {
    pub command: String,
    #[serde(default)]
    pub responded: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

/// Free-form payload addressed to this client by another bridge client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomPayload {
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct StatsQueryResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub stats_name: String,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct OnlineQueryResult {
    #[serde(default)]
    pub data: Vec<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum QueryResult {
    Stats(StatsQueryResult),
    Online(OnlineQueryResult),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ChatPayload, EventKind, GatewayEvent, ScopeKind};

    fn decode(value: serde_json::Value) -> GatewayEvent {
        match serde_json::from_value(value) {
            Ok(event) => event,
            Err(error) => panic!("event decode failed: {error}"),
        }
    }

    #[test]
    fn group_message_decodes() {
        let event = decode(json!({
            "post_type": "message",
            "message_type": "group",
            "group_id": 12345,
            "anonymous": null,
            "raw_message": "hello",
            "sender": {"card": "", "nickname": "alice"},
            "self_id": 10001
        }));

        assert_eq!(event.event_kind(), EventKind::Message);
        assert_eq!(event.scope_kind(), ScopeKind::Group);
        assert_eq!(event.group_id, Some(12345));
        assert!(!event.is_anonymous());
        assert_eq!(event.raw_text(), "hello");
        assert_eq!(event.sender_display_name(), "alice");
    }

    #[test]
    fn card_takes_precedence_over_nickname() {
        let event = decode(json!({
            "sender": {"card": "Steve", "nickname": "alice"}
        }));

        assert_eq!(event.sender_display_name(), "Steve");
    }

    #[test]
    fn anonymous_object_marks_event_anonymous() {
        let event = decode(json!({
            "post_type": "message",
            "anonymous": {"id": 1, "name": "ghost", "flag": "x"}
        }));

        assert!(event.is_anonymous());
    }

    #[test]
    fn heartbeat_frame_is_other() {
        let event = decode(json!({
            "post_type": "meta_event",
            "meta_event_type": "heartbeat"
        }));

        assert_eq!(event.event_kind(), EventKind::Other);
        assert_eq!(event.scope_kind(), ScopeKind::Other);
        assert_eq!(event.raw_text(), "");
        assert_eq!(event.sender_display_name(), "");
    }

    #[test]
    fn chat_payload_formatting() {
        assert_eq!(ChatPayload::new("Steve", "hi").formatted(), "<Steve> hi");
        assert_eq!(ChatPayload::new("", "server started").formatted(), "server started");
    }
}
