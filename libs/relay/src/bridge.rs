use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ChatPayload, CommandPayload, CustomPayload};

/// Handle to the internal messaging network that links the game servers.
///
/// Connection management, authentication and reconnects belong to the
/// implementation; the relay only checks liveness and pushes messages.
#[async_trait]
pub trait BridgeClient: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn is_online(&self) -> bool;

    async fn send_command(&self, target_client: &str, command: &str) -> Result<()>;

    async fn broadcast_chat(&self, text: &str, sender: &str) -> Result<()>;
}

/// Event delivered by the bridge client's receive loop.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    Chat {
        sender: String,
        payload: ChatPayload,
    },
    Command {
        sender: String,
        payload: CommandPayload,
    },
    Custom {
        sender: String,
        payload: CustomPayload,
    },
}

impl BridgeEvent {
    pub fn sender(&self) -> &str {
        match self {
            BridgeEvent::Chat { sender, .. }
            | BridgeEvent::Command { sender, .. }
            | BridgeEvent::Custom { sender, .. } => sender,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BridgeEvent::Chat { .. } => "chat",
            BridgeEvent::Command { .. } => "command",
            BridgeEvent::Custom { .. } => "custom",
        }
    }
}
