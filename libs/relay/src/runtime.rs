use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    bridge::{BridgeClient, BridgeEvent},
    config::RelayConfig,
    gateway::GatewaySink,
    onebot::OneBotSession,
    relay::{Relay, RelayState},
    resolver::{HttpMentionResolver, MentionResolver},
};

const INBOUND_QUEUE: usize = 512;

/// A relay wired to a live OneBot session and a bridge client.
pub struct RelayRuntime {
    session: Arc<OneBotSession>,
    relay: Arc<Relay>,
}

impl RelayRuntime {
    pub fn new(config: RelayConfig, bridge: Arc<dyn BridgeClient>) -> Result<Self> {
        config.validate()?;

        let session = Arc::new(OneBotSession::new(config.gateway_url()));
        let resolver: Arc<dyn MentionResolver> = Arc::new(HttpMentionResolver::new(
            config.member_info_base_url(),
            config.gateway.react_group_id,
            config.gateway.access_token.clone(),
        ));

        let state = Arc::new(RelayState::new());
        state.set_gateway(Some(session.clone() as Arc<dyn GatewaySink>));
        state.set_bridge(Some(bridge));

        let relay = Arc::new(Relay::new(config, state, resolver));

        Ok(Self { session, relay })
    }

    /// Run the OneBot session and both relay streams until `cancel` fires.
    pub async fn run(
        &self,
        bridge_rx: mpsc::Receiver<BridgeEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);

        let runtime_cancel = CancellationToken::new();

        let session = self.session.clone();
        let session_cancel = runtime_cancel.child_token();
        let session_task = tokio::spawn(async move {
            if let Err(error) = session.start(inbound_tx, session_cancel).await {
                error!(error = %error, "onebot session terminated");
            }
        });

        let relay = self.relay.clone();
        let relay_cancel = runtime_cancel.child_token();
        let relay_task = tokio::spawn(relay.run(inbound_rx, bridge_rx, relay_cancel));

        info!("relay runtime started");

        cancel.cancelled().await;
        runtime_cancel.cancel();

        let _ = session_task.await;
        let _ = relay_task.await;

        info!("relay runtime stopped");

        Ok(())
    }
}

/// Build a runtime from `config` and run it until `cancel` fires.
pub async fn serve(
    config: RelayConfig,
    bridge: Arc<dyn BridgeClient>,
    bridge_rx: mpsc::Receiver<BridgeEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    RelayRuntime::new(config, bridge)?.run(bridge_rx, cancel).await
}
