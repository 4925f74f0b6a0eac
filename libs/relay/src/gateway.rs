use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::types::ConnectionStatus;

/// Outbound half of the chat-group gateway.
#[async_trait]
pub trait GatewaySink: Send + Sync + 'static {
    async fn send_group_msg(&self, group_id: i64, message: &str) -> Result<()>;

    fn status(&self) -> ConnectionStatus;
}

/// OneBot v11 action frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OneBotAction {
    pub action: String,
    pub params: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<String>,
}

impl OneBotAction {
    pub fn send_group_msg(group_id: i64, message: &str) -> Self {
        Self {
            action: "send_group_msg".to_string(),
            params: json!({
                "group_id": group_id,
                "message": message,
            }),
            echo: None,
        }
    }

    pub fn get_login_info(echo: &str) -> Self {
        Self {
            action: "get_login_info".to_string(),
            params: json!({}),
            echo: Some(echo.to_string()),
        }
    }

    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Reply to an action that carried an `echo` field.
#[derive(Debug, Clone, Deserialize)]
pub struct OneBotActionReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub echo: Option<String>,
}
