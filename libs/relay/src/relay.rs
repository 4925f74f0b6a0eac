use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    bridge::{BridgeClient, BridgeEvent},
    chunking::chunk_text,
    classifier::{ClassifierConfig, classify},
    config::RelayConfig,
    dispatcher::{CommandDispatcher, Dispatch},
    error::{RelayError, ServerInfoError},
    formatter::format_response,
    gateway::GatewaySink,
    messages::{FETCHING_SERVER_INFO, HELP_MESSAGE, PONG, SERVER_INFO_NOT_CONFIGURED},
    resolver::MentionResolver,
    sanitizer::sanitize,
    server_info::{ServerInfoClient, render_daemon, render_failure},
    types::{ChatPayload, CommandPayload, ConnectionStatus, CustomPayload, GatewayEvent, Intent},
};

const QQ_CHAT_PREFIX: &str = "!!qq ";
const CUSTOM_ACTION_KEY: &str = "cqhttp_client.action";
const CUSTOM_ACTION_SEND_TEXT: &str = "send_text";

/// Live collaborator handles. Either side may be absent while it connects.
#[derive(Default)]
pub struct RelayState {
    gateway: Mutex<Option<Arc<dyn GatewaySink>>>,
    bridge: Mutex<Option<Arc<dyn BridgeClient>>>,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_gateway(&self, gateway: Option<Arc<dyn GatewaySink>>) {
        *lock_slot(&self.gateway) = gateway;
    }

    pub fn gateway(&self) -> Option<Arc<dyn GatewaySink>> {
        lock_slot(&self.gateway).clone()
    }

    pub fn set_bridge(&self, bridge: Option<Arc<dyn BridgeClient>>) {
        *lock_slot(&self.bridge) = bridge;
    }

    pub fn bridge(&self) -> Option<Arc<dyn BridgeClient>> {
        lock_slot(&self.bridge).clone()
    }
}

/// Slots hold a plain `Option<Arc<_>>`, so a poisoned lock still guards a
/// consistent value.
fn lock_slot<T: ?Sized>(slot: &Mutex<Option<Arc<T>>>) -> MutexGuard<'_, Option<Arc<T>>> {
    slot.lock().unwrap_or_else(|poisoned| {
        warn!("relay state lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Decide whether an in-game chat line goes to the group, and how it reads.
///
/// With `mc_to_qq` every line is relayed. Otherwise only lines starting with
/// `!!qq ` are relayed, with the prefix removed.
pub fn chat_relay_text(mc_to_qq: bool, sender: &str, payload: &ChatPayload) -> Option<String> {
    let formatted = if mc_to_qq {
        payload.formatted()
    } else {
        let message = payload.message.strip_prefix(QQ_CHAT_PREFIX)?;
        ChatPayload::new(payload.author.clone(), message).formatted()
    };

    Some(format!("[{sender}] {formatted}"))
}

/// Text requested through a custom payload, if it is a `send_text` action.
pub fn custom_send_text(payload: &CustomPayload) -> Option<&str> {
    let action = payload.data.get(CUSTOM_ACTION_KEY)?.as_str()?;
    if action != CUSTOM_ACTION_SEND_TEXT {
        return None;
    }
    payload.data.get("text")?.as_str()
}

pub struct Relay {
    state: Arc<RelayState>,
    config: RelayConfig,
    classifier: ClassifierConfig,
    dispatcher: CommandDispatcher,
    resolver: Arc<dyn MentionResolver>,
    server_info: Option<ServerInfoClient>,
}

impl Relay {
    pub fn new(
        config: RelayConfig,
        state: Arc<RelayState>,
        resolver: Arc<dyn MentionResolver>,
    ) -> Self {
        let classifier = ClassifierConfig {
            react_group_id: config.gateway.react_group_id,
            qq_to_mc: config.relay.qq_to_mc,
        };
        let dispatcher = CommandDispatcher::new(
            config.bridge.client_to_query_stats.clone(),
            config.bridge.client_to_query_online.clone(),
        );
        let server_info = ServerInfoClient::from_settings(&config.server_info);

        Self {
            state,
            config,
            classifier,
            dispatcher,
            resolver,
            server_info,
        }
    }

    pub fn state(&self) -> &Arc<RelayState> {
        &self.state
    }

    /// Consume both inbound streams until cancelled or both senders close.
    pub async fn run(
        self: Arc<Self>,
        gateway_rx: mpsc::Receiver<String>,
        bridge_rx: mpsc::Receiver<BridgeEvent>,
        cancel: CancellationToken,
    ) {
        let gateway_task =
            tokio::spawn(Arc::clone(&self).run_gateway_stream(gateway_rx, cancel.clone()));
        let bridge_task = tokio::spawn(self.run_bridge_stream(bridge_rx, cancel));

        if let Err(error) = gateway_task.await {
            error!(error = %error, "gateway stream task failed");
        }
        if let Err(error) = bridge_task.await {
            error!(error = %error, "bridge stream task failed");
        }
    }

    async fn run_gateway_stream(
        self: Arc<Self>,
        mut gateway_rx: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                maybe_frame = gateway_rx.recv() => {
                    let Some(frame) = maybe_frame else {
                        break;
                    };
                    if let Err(error) = self.handle_gateway_frame(&frame).await {
                        error!(error = %error, "failed to handle gateway event");
                    }
                }
            }
        }
    }

    async fn run_bridge_stream(
        self: Arc<Self>,
        mut bridge_rx: mpsc::Receiver<BridgeEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                maybe_event = bridge_rx.recv() => {
                    let Some(event) = maybe_event else {
                        break;
                    };
                    let kind = event.kind();
                    let sender = event.sender().to_string();
                    if let Err(error) = self.handle_bridge_event(event).await {
                        error!(
                            error = %error,
                            kind,
                            sender = %sender,
                            "failed to handle bridge event"
                        );
                    }
                }
            }
        }
    }

    /// Classify one raw gateway frame and act on every matched intent.
    ///
    /// All intents run even if an earlier one fails; the first failure is
    /// returned.
    pub async fn handle_gateway_frame(self: &Arc<Self>, raw: &str) -> Result<(), RelayError> {
        let event: GatewayEvent = serde_json::from_str(raw)?;
        let intents = classify(&event, self.classifier);

        let mut first_error = None;
        for intent in intents {
            if intent == Intent::Ignore {
                continue;
            }
            debug!(?intent, group_id = ?event.group_id, "handling intent");
            if let Err(error) = self.handle_intent(intent).await
                && first_error.is_none()
            {
                first_error = Some(error);
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn handle_intent(self: &Arc<Self>, intent: Intent) -> Result<(), RelayError> {
        match intent {
            Intent::Help => self.send_text(HELP_MESSAGE).await,
            Intent::Ping => self.send_text(PONG).await,
            Intent::Chat { text, sender } => self.relay_chat(&text, &sender).await,
            Intent::Info => self.handle_info().await,
            Intent::Online | Intent::Stats { .. } => self.handle_query(&intent).await,
            Intent::Ignore => Ok(()),
        }
    }

    async fn relay_chat(&self, text: &str, sender: &str) -> Result<(), RelayError> {
        let Some(bridge) = self.state.bridge() else {
            debug!("no bridge client, dropping group chat");
            return Ok(());
        };

        let message = sanitize(
            text,
            self.resolver.as_ref(),
            self.config.relay.enable_chat_image_support,
        )
        .await?;

        info!(sender, client = bridge.name(), "relaying group chat");
        bridge
            .broadcast_chat(&message, sender)
            .await
            .map_err(|error| RelayError::Bridge(error.to_string()))
    }

    async fn handle_query(&self, intent: &Intent) -> Result<(), RelayError> {
        let bridge = self.state.bridge();
        let online = bridge.as_ref().is_some_and(|bridge| bridge.is_online());

        match self.dispatcher.dispatch(intent, online) {
            Some(Dispatch::Request(request)) => {
                let Some(bridge) = bridge else {
                    return Ok(());
                };
                info!(
                    command = %request.command,
                    client = %request.target_client,
                    "sending command"
                );
                bridge
                    .send_command(&request.target_client, &request.command)
                    .await
                    .map_err(|error| RelayError::Bridge(error.to_string()))
            }
            Some(Dispatch::Notice(notice)) => self.send_text(&notice).await,
            None => Ok(()),
        }
    }

    async fn handle_info(self: &Arc<Self>) -> Result<(), RelayError> {
        if self.server_info.is_none() {
            return self.send_text(SERVER_INFO_NOT_CONFIGURED).await;
        }

        self.send_text(FETCHING_SERVER_INFO).await?;

        let relay = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = relay.report_server_info().await {
                error!(error = %error, "failed to report server info");
            }
        });

        Ok(())
    }

    async fn report_server_info(&self) -> Result<(), RelayError> {
        let Some(client) = &self.server_info else {
            return Ok(());
        };

        match client.fetch().await {
            Ok(daemons) => {
                for (index, daemon) in daemons.iter().enumerate() {
                    self.send_text(&render_daemon(index, daemon)).await?;
                }
                Ok(())
            }
            Err(ServerInfoError::Status(status)) => {
                self.send_text(&render_failure(status)).await
            }
            Err(error) => {
                warn!(error = %error, "server info request failed");
                Ok(())
            }
        }
    }

    pub async fn handle_bridge_event(&self, event: BridgeEvent) -> Result<(), RelayError> {
        match event {
            BridgeEvent::Chat { sender, payload } => self.on_bridge_chat(&sender, &payload).await,
            BridgeEvent::Command { sender, payload } => {
                self.on_bridge_command(&sender, &payload).await
            }
            BridgeEvent::Custom { sender, payload } => {
                self.on_bridge_custom(&sender, &payload).await
            }
        }
    }

    async fn on_bridge_chat(&self, sender: &str, payload: &ChatPayload) -> Result<(), RelayError> {
        let Some(text) = chat_relay_text(self.config.relay.mc_to_qq, sender, payload) else {
            return Ok(());
        };

        info!(sender, "relaying game chat");
        self.send_text(&text).await
    }

    async fn on_bridge_command(
        &self,
        sender: &str,
        payload: &CommandPayload,
    ) -> Result<(), RelayError> {
        let Some(text) = format_response(payload)? else {
            return Ok(());
        };

        debug!(sender, command = %payload.command, "relaying command result");
        self.send_text(&text).await
    }

    async fn on_bridge_custom(
        &self,
        sender: &str,
        payload: &CustomPayload,
    ) -> Result<(), RelayError> {
        let Some(text) = custom_send_text(payload) else {
            return Ok(());
        };

        info!(sender, "relaying custom text");
        self.send_text(text).await
    }

    /// Send `text` to the configured group, chunked to the gateway limit.
    pub async fn send_text(&self, text: &str) -> Result<(), RelayError> {
        let Some(gateway) = self.state.gateway() else {
            debug!("no gateway, dropping outbound text");
            return Ok(());
        };

        let status = gateway.status();
        if status != ConnectionStatus::Connected {
            debug!(%status, "gateway not connected, dropping outbound text");
            return Ok(());
        }

        let group_id = self.config.gateway.react_group_id;
        for chunk in chunk_text(text, self.config.relay.chunk_limit) {
            gateway
                .send_group_msg(group_id, &chunk)
                .await
                .map_err(|error| RelayError::GatewaySend(error.to_string()))?;
        }

        Ok(())
    }
}
