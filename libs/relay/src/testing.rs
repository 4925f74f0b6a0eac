//! In-memory collaborators for relay tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    bridge::BridgeClient, error::ResolveError, gateway::GatewaySink,
    resolver::MentionResolver, types::ConnectionStatus,
};

pub struct FakeResolver {
    names: HashMap<String, String>,
}

impl FakeResolver {
    pub fn with_names(names: &[(&str, &str)]) -> Self {
        Self {
            names: names
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl MentionResolver for FakeResolver {
    async fn resolve(&self, user_id: &str) -> Result<String, ResolveError> {
        self.names
            .get(user_id)
            .cloned()
            .ok_or_else(|| ResolveError::MissingName(user_id.to_string()))
    }
}

/// Resolver that parks every lookup until `release` is called.
pub struct GatedResolver {
    inner: FakeResolver,
    entered: Notify,
    release: Notify,
}

impl GatedResolver {
    pub fn with_names(names: &[(&str, &str)]) -> Self {
        Self {
            inner: FakeResolver::with_names(names),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Wait until a lookup is parked inside the resolver.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl MentionResolver for GatedResolver {
    async fn resolve(&self, user_id: &str) -> Result<String, ResolveError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.resolve(user_id).await
    }
}

pub struct FakeGateway {
    sent: Mutex<Vec<(i64, String)>>,
    fail: AtomicBool,
    status: Mutex<ConnectionStatus>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::with_status(ConnectionStatus::Connected)
    }
}

impl FakeGateway {
    pub fn with_status(status: ConnectionStatus) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            status: Mutex::new(status),
        }
    }

    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.fail.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = status;
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, message)| message).collect()
    }
}

#[async_trait]
impl GatewaySink for FakeGateway {
    async fn send_group_msg(&self, group_id: i64, message: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("gateway closed"));
        }
        if let Ok(mut guard) = self.sent.lock() {
            guard.push((group_id, message.to_string()));
        }
        Ok(())
    }

    fn status(&self) -> ConnectionStatus {
        self.status
            .lock()
            .map(|guard| *guard)
            .unwrap_or(ConnectionStatus::Disconnected)
    }
}

pub struct FakeBridge {
    name: String,
    online: AtomicBool,
    commands: Mutex<Vec<(String, String)>>,
    chats: Mutex<Vec<(String, String)>>,
}

impl FakeBridge {
    pub fn new(online: bool) -> Self {
        Self {
            name: "CQHttpClient".to_string(),
            online: AtomicBool::new(online),
            commands: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// `(target_client, command)` pairs in send order.
    pub fn commands(&self) -> Vec<(String, String)> {
        self.commands
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// `(text, sender)` pairs in send order.
    pub fn chats(&self) -> Vec<(String, String)> {
        self.chats
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BridgeClient for FakeBridge {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn send_command(&self, target_client: &str, command: &str) -> Result<()> {
        if let Ok(mut guard) = self.commands.lock() {
            guard.push((target_client.to_string(), command.to_string()));
        }
        Ok(())
    }

    async fn broadcast_chat(&self, text: &str, sender: &str) -> Result<()> {
        if let Ok(mut guard) = self.chats.lock() {
            guard.push((text.to_string(), sender.to_string()));
        }
        Ok(())
    }
}
