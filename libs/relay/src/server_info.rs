//! MCSManager remote-services lookup behind `!!info`.

use serde::Deserialize;
use tracing::debug;

use crate::{config::ServerInfoSettings, error::ServerInfoError};

const STATUS_OK: i64 = 200;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteServicesResponse {
    pub status: i64,
    #[serde(default)]
    pub data: Vec<RemoteDaemon>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteDaemon {
    #[serde(default)]
    pub instance: InstanceCounts,
    #[serde(default)]
    pub system: SystemUsage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceCounts {
    #[serde(default)]
    pub running: i64,
    #[serde(default)]
    pub total: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemUsage {
    #[serde(default)]
    pub totalmem: f64,
    #[serde(default)]
    pub freemem: f64,
    #[serde(default)]
    pub mem_usage: f64,
    #[serde(default)]
    pub cpu_usage: f64,
}

#[derive(Debug, Clone)]
pub struct ServerInfoClient {
    api_addr: String,
    api_key: String,
    http: reqwest::Client,
}

impl ServerInfoClient {
    pub fn new(api_addr: String, api_key: String) -> Self {
        Self {
            api_addr: api_addr.trim_end_matches('/').to_string(),
            api_key,
            http: reqwest::Client::new(),
        }
    }

    /// `None` when no endpoint is configured.
    pub fn from_settings(settings: &ServerInfoSettings) -> Option<Self> {
        if settings.mcsm_api_addr.trim().is_empty() {
            return None;
        }
        Some(Self::new(
            settings.mcsm_api_addr.clone(),
            settings.mcsm_api_key.clone(),
        ))
    }

    pub fn endpoint(&self) -> String {
        format!(
            "http://{}/api/service/remote_services_system/?apikey={}",
            self.api_addr, self.api_key
        )
    }

    /// Fetch daemon statistics. A non-200 `status` in the body is an error.
    pub async fn fetch(&self) -> Result<Vec<RemoteDaemon>, ServerInfoError> {
        debug!(addr = %self.api_addr, "fetching remote services info");

        let response: RemoteServicesResponse = self
            .http
            .get(self.endpoint())
            .header("x-requested-with", "xmlhttprequest")
            .send()
            .await?
            .json()
            .await?;

        daemons_from_response(response)
    }
}

fn daemons_from_response(
    response: RemoteServicesResponse,
) -> Result<Vec<RemoteDaemon>, ServerInfoError> {
    if response.status != STATUS_OK {
        return Err(ServerInfoError::Status(response.status));
    }
    Ok(response.data)
}

/// One text block per daemon, numbered from 1.
pub fn render_daemon(index: usize, daemon: &RemoteDaemon) -> String {
    let system = &daemon.system;
    let used_gb = (system.totalmem - system.freemem) / BYTES_PER_GB;
    let total_gb = system.totalmem / BYTES_PER_GB;

    format!(
        "服务器{}的信息如下：\n实例(正常/总数)：{}/{}\n内存使用情况：{used_gb:.2}GB/{total_gb:.2}GB\n内存占用率：{:.2}%\nCPU占用率：{:.2}%",
        index + 1,
        daemon.instance.running,
        daemon.instance.total,
        system.mem_usage * 100.0,
        system.cpu_usage * 100.0,
    )
}

pub fn render_failure(status: i64) -> String {
    format!("请求失败，状态码为{status}")
}
