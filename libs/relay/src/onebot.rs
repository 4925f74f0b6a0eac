use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    gateway::{GatewaySink, OneBotAction, OneBotActionReply},
    types::ConnectionStatus,
};

const OUTBOUND_QUEUE: usize = 256;
const MAX_BACKOFF_SECS: u64 = 30;
const PROBE_ECHO: &str = "cqbridge-probe";
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bot account reported by `get_login_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
}

/// Forward OneBot v11 WebSocket client.
///
/// `start` owns the socket for the lifetime of the session: text frames go
/// to `inbound_tx`, outbound actions are drained from an internal queue, and
/// the connection is re-established with exponential backoff until the
/// cancellation token fires.
pub struct OneBotSession {
    url: String,
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: Mutex<Option<mpsc::Receiver<String>>>,
    status: Mutex<ConnectionStatus>,
}

impl OneBotSession {
    pub fn new(url: String) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        Self {
            url,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            status: Mutex::new(ConnectionStatus::Disconnected),
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        if let Ok(mut guard) = self.status.lock() {
            let previous = *guard;
            if previous != status {
                debug!(from = %previous, to = %status, "gateway status changed");
            }
            *guard = status;
        }
    }

    pub async fn start(
        &self,
        inbound_tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut outbound_rx = self
            .outbound_rx
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
            .ok_or_else(|| anyhow!("onebot session already started"))?;

        let mut reconnect_backoff_secs = 1_u64;

        loop {
            if cancel.is_cancelled() {
                self.set_status(ConnectionStatus::Disconnected);
                return Ok(());
            }

            self.set_status(ConnectionStatus::Connecting);
            info!(url = %redact_token(&self.url), "connecting to onebot gateway");

            let ws = match tokio_tungstenite::connect_async(&self.url).await {
                Ok((stream, _response)) => stream,
                Err(error) => {
                    error!(error = %error, "onebot websocket connect failed");
                    self.set_status(ConnectionStatus::Disconnected);
                    if !backoff(&cancel, &mut reconnect_backoff_secs).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            reconnect_backoff_secs = 1;
            self.set_status(ConnectionStatus::Connected);
            info!("onebot gateway connected");

            let (mut writer, mut reader) = ws.split();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = writer.send(WsMessage::Close(None)).await;
                        self.set_status(ConnectionStatus::Disconnected);
                        return Ok(());
                    }
                    maybe_frame = outbound_rx.recv() => {
                        let Some(frame) = maybe_frame else {
                            break;
                        };
                        if let Err(error) = writer.send(WsMessage::Text(frame)).await {
                            warn!(error = %error, "onebot websocket write failed");
                            break;
                        }
                    }
                    next = reader.next() => {
                        let Some(next) = next else {
                            info!("onebot gateway stream ended");
                            break;
                        };

                        let message = match next {
                            Ok(message) => message,
                            Err(error) => {
                                warn!(error = %error, "onebot websocket read failed");
                                break;
                            }
                        };

                        match message {
                            WsMessage::Text(text) => {
                                if inbound_tx.send(text).await.is_err() {
                                    self.set_status(ConnectionStatus::Disconnected);
                                    return Ok(());
                                }
                            }
                            WsMessage::Ping(payload) => {
                                if writer.send(WsMessage::Pong(payload)).await.is_err() {
                                    break;
                                }
                            }
                            WsMessage::Close(frame) => {
                                let reason = frame
                                    .map(|frame| frame.reason.to_string())
                                    .unwrap_or_default();
                                info!(reason = %reason, "onebot gateway closed connection");
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }

            self.set_status(ConnectionStatus::Disconnected);
            if !backoff(&cancel, &mut reconnect_backoff_secs).await {
                return Ok(());
            }
        }
    }

    /// Connect once, ask for the bot identity and disconnect.
    pub async fn probe(url: &str) -> Result<LoginInfo> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .context("onebot websocket connect failed")?;
        let (mut writer, mut reader) = ws.split();

        let request = OneBotAction::get_login_info(PROBE_ECHO).to_frame()?;
        writer
            .send(WsMessage::Text(request))
            .await
            .context("onebot get_login_info send failed")?;

        let login = tokio::time::timeout(PROBE_TIMEOUT, async {
            while let Some(next) = reader.next().await {
                let message = next.context("onebot websocket read failed")?;
                let WsMessage::Text(text) = message else {
                    continue;
                };
                if let Some(login) = parse_login_reply(&text)? {
                    return Ok(login);
                }
            }
            Err::<LoginInfo, anyhow::Error>(anyhow!("onebot gateway closed before replying"))
        })
        .await
        .map_err(|_| anyhow!("timed out waiting for get_login_info reply"))??;

        let _ = writer.send(WsMessage::Close(None)).await;
        Ok(login)
    }
}

/// `Ok(None)` for frames that are not the probe reply, such as events.
fn parse_login_reply(text: &str) -> Result<Option<LoginInfo>> {
    let Ok(reply) = serde_json::from_str::<OneBotActionReply>(text) else {
        return Ok(None);
    };
    if reply.echo.as_deref() != Some(PROBE_ECHO) {
        return Ok(None);
    }
    if reply.retcode != 0 {
        return Err(anyhow!(
            "get_login_info failed with status {} (retcode {})",
            reply.status,
            reply.retcode
        ));
    }

    let data = reply
        .data
        .ok_or_else(|| anyhow!("get_login_info reply has no data"))?;
    let login = serde_json::from_value(data).context("get_login_info decode failed")?;
    Ok(Some(login))
}

/// Sleep for the current backoff, then double it. False when cancelled.
async fn backoff(cancel: &CancellationToken, secs: &mut u64) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => return false,
        _ = tokio::time::sleep(Duration::from_secs(*secs)) => {}
    }
    *secs = (*secs * 2).min(MAX_BACKOFF_SECS);
    true
}

fn redact_token(url: &str) -> String {
    match url.split_once("access_token=") {
        Some((base, _)) => format!("{base}access_token=***"),
        None => url.to_string(),
    }
}

#[async_trait]
impl GatewaySink for OneBotSession {
    async fn send_group_msg(&self, group_id: i64, message: &str) -> Result<()> {
        if self.status() != ConnectionStatus::Connected {
            return Err(anyhow!("onebot gateway is not connected"));
        }

        let frame = OneBotAction::send_group_msg(group_id, message).to_frame()?;
        self.outbound_tx
            .send(frame)
            .await
            .map_err(|_| anyhow!("onebot session has stopped"))
    }

    fn status(&self) -> ConnectionStatus {
        self.status
            .lock()
            .map(|guard| *guard)
            .unwrap_or(ConnectionStatus::Disconnected)
    }
}
