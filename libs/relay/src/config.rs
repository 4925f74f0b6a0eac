use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RELAY_CONFIG_PATH: &str = "~/.cqbridge/cqhttp.toml";
pub const DEFAULT_CHUNK_LIMIT: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct RelayCliFlags {
    pub ws_address: Option<String>,
    pub ws_port: Option<u16>,
    pub access_token: Option<String>,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayConfig {
    pub gateway: GatewaySettings,
    pub bridge: BridgeSettings,
    pub relay: RelaySettings,
    pub server_info: ServerInfoSettings,
}

/// OneBot endpoint and the single group this relay reacts to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    pub ws_address: String,
    pub ws_port: u16,
    pub access_token: String,
    pub http_address: String,
    pub http_port: u16,
    pub react_group_id: i64,
}

/// Names of the bridge clients that answer queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    pub client_to_query_stats: String,
    pub client_to_query_online: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    pub qq_to_mc: bool,
    pub mc_to_qq: bool,
    pub enable_chat_image_support: bool,
    pub chunk_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerInfoSettings {
    pub mcsm_api_addr: String,
    pub mcsm_api_key: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            ws_address: "127.0.0.1".to_string(),
            ws_port: 6700,
            access_token: String::new(),
            http_address: "127.0.0.1".to_string(),
            http_port: 5700,
            react_group_id: 12345,
        }
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            client_to_query_stats: "MyClient1".to_string(),
            client_to_query_online: "MyClient2".to_string(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            qq_to_mc: true,
            mc_to_qq: false,
            enable_chat_image_support: false,
            chunk_limit: DEFAULT_CHUNK_LIMIT,
        }
    }
}

impl RelayConfig {
    pub fn load(config_path: Option<&Path>, cli: &RelayCliFlags) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_relay_config_path);

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|error| {
                anyhow!("failed to read relay config {}: {error}", path.display())
            })?;
            let persisted: PersistedRelayConfig = toml::from_str(&text).map_err(|error| {
                anyhow!("failed to parse relay config {}: {error}", path.display())
            })?;
            persisted.into_runtime()
        } else {
            RelayConfig::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(cli);
        config.validate()?;

        Ok(config)
    }

    pub fn load_default(cli: &RelayCliFlags) -> Result<Self> {
        Self::load(None, cli)
    }

    pub fn save(&self, config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_relay_config_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                anyhow!("failed to create config dir {}: {error}", parent.display())
            })?;
        }

        let persisted = PersistedRelayConfig::from_runtime(self);
        let text = toml::to_string_pretty(&persisted)
            .map_err(|error| anyhow!("failed to serialize relay config: {error}"))?;

        std::fs::write(&path, text).map_err(|error| {
            anyhow!("failed to write relay config {}: {error}", path.display())
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway.ws_address.trim().is_empty() {
            return Err(anyhow!("ws_address cannot be empty"));
        }

        if self.gateway.ws_port == 0 {
            return Err(anyhow!("ws_port cannot be 0"));
        }

        if self.bridge.client_to_query_stats.trim().is_empty() {
            return Err(anyhow!("client_to_query_stats cannot be empty"));
        }

        if self.bridge.client_to_query_online.trim().is_empty() {
            return Err(anyhow!("client_to_query_online cannot be empty"));
        }

        if self.relay.chunk_limit == 0 {
            return Err(anyhow!("chunk_limit must be greater than 0"));
        }

        if !self.server_info.mcsm_api_addr.trim().is_empty()
            && self.server_info.mcsm_api_key.trim().is_empty()
        {
            return Err(anyhow!("mcsm_api_addr requires a non-empty mcsm_api_key"));
        }

        Ok(())
    }

    /// `ws://host:port/`, with the access token as a query parameter when set.
    pub fn gateway_url(&self) -> String {
        let mut url = format!(
            "ws://{}:{}/",
            self.gateway.ws_address, self.gateway.ws_port
        );
        if !self.gateway.access_token.is_empty() {
            url.push_str(&format!("?access_token={}", self.gateway.access_token));
        }
        url
    }

    pub fn member_info_base_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.gateway.http_address, self.gateway.http_port
        )
    }

    pub fn has_server_info(&self) -> bool {
        !self.server_info.mcsm_api_addr.trim().is_empty()
    }

    fn apply_env_overrides(&mut self) {
        if self.gateway.access_token.trim().is_empty()
            && let Ok(value) = std::env::var("CQBRIDGE_ACCESS_TOKEN")
        {
            self.gateway.access_token = value;
        }

        if let Ok(value) = std::env::var("CQBRIDGE_WS_ADDRESS")
            && !value.trim().is_empty()
        {
            self.gateway.ws_address = value;
        }

        if let Ok(value) = std::env::var("CQBRIDGE_WS_PORT")
            && let Ok(port) = value.trim().parse::<u16>()
        {
            self.gateway.ws_port = port;
        }

        if let Ok(value) = std::env::var("CQBRIDGE_GROUP_ID")
            && let Ok(group_id) = value.trim().parse::<i64>()
        {
            self.gateway.react_group_id = group_id;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &RelayCliFlags) {
        if let Some(address) = &cli.ws_address {
            self.gateway.ws_address = address.clone();
        }
        if let Some(port) = cli.ws_port {
            self.gateway.ws_port = port;
        }
        if let Some(token) = &cli.access_token {
            self.gateway.access_token = token.clone();
        }
        if let Some(group_id) = cli.group_id {
            self.gateway.react_group_id = group_id;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
struct PersistedRelayConfig {
    #[serde(default)]
    gateway: PersistedGatewaySettings,
    #[serde(default)]
    bridge: PersistedBridgeSettings,
    #[serde(default)]
    relay: PersistedRelaySettings,
    #[serde(default)]
    server_info: PersistedServerInfoSettings,
}

impl PersistedRelayConfig {
    fn into_runtime(self) -> RelayConfig {
        let gateway_defaults = GatewaySettings::default();
        let bridge_defaults = BridgeSettings::default();
        let relay_defaults = RelaySettings::default();

        RelayConfig {
            gateway: GatewaySettings {
                ws_address: self
                    .gateway
                    .ws_address
                    .unwrap_or(gateway_defaults.ws_address),
                ws_port: self.gateway.ws_port.unwrap_or(gateway_defaults.ws_port),
                access_token: self.gateway.access_token.unwrap_or_default(),
                http_address: self
                    .gateway
                    .http_address
                    .unwrap_or(gateway_defaults.http_address),
                http_port: self.gateway.http_port.unwrap_or(gateway_defaults.http_port),
                react_group_id: self
                    .gateway
                    .react_group_id
                    .unwrap_or(gateway_defaults.react_group_id),
            },
            bridge: BridgeSettings {
                client_to_query_stats: self
                    .bridge
                    .client_to_query_stats
                    .unwrap_or(bridge_defaults.client_to_query_stats),
                client_to_query_online: self
                    .bridge
                    .client_to_query_online
                    .unwrap_or(bridge_defaults.client_to_query_online),
            },
            relay: RelaySettings {
                qq_to_mc: self.relay.qq_to_mc.unwrap_or(relay_defaults.qq_to_mc),
                mc_to_qq: self.relay.mc_to_qq.unwrap_or(relay_defaults.mc_to_qq),
                enable_chat_image_support: self
                    .relay
                    .enable_chat_image_support
                    .unwrap_or(relay_defaults.enable_chat_image_support),
                chunk_limit: self.relay.chunk_limit.unwrap_or(relay_defaults.chunk_limit),
            },
            server_info: ServerInfoSettings {
                mcsm_api_addr: self.server_info.mcsm_api_addr.unwrap_or_default(),
                mcsm_api_key: self.server_info.mcsm_api_key.unwrap_or_default(),
            },
        }
    }

    fn from_runtime(config: &RelayConfig) -> Self {
        Self {
            gateway: PersistedGatewaySettings {
                ws_address: Some(config.gateway.ws_address.clone()),
                ws_port: Some(config.gateway.ws_port),
                access_token: Some(config.gateway.access_token.clone()),
                http_address: Some(config.gateway.http_address.clone()),
                http_port: Some(config.gateway.http_port),
                react_group_id: Some(config.gateway.react_group_id),
            },
            bridge: PersistedBridgeSettings {
                client_to_query_stats: Some(config.bridge.client_to_query_stats.clone()),
                client_to_query_online: Some(config.bridge.client_to_query_online.clone()),
            },
            relay: PersistedRelaySettings {
                qq_to_mc: Some(config.relay.qq_to_mc),
                mc_to_qq: Some(config.relay.mc_to_qq),
                enable_chat_image_support: Some(config.relay.enable_chat_image_support),
                chunk_limit: Some(config.relay.chunk_limit),
            },
            server_info: PersistedServerInfoSettings {
                mcsm_api_addr: Some(config.server_info.mcsm_api_addr.clone()),
                mcsm_api_key: Some(config.server_info.mcsm_api_key.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
struct PersistedGatewaySettings {
    #[serde(default)]
    ws_address: Option<String>,
    #[serde(default)]
    ws_port: Option<u16>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    http_address: Option<String>,
    #[serde(default)]
    http_port: Option<u16>,
    #[serde(default)]
    react_group_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
struct PersistedBridgeSettings {
    #[serde(default)]
    client_to_query_stats: Option<String>,
    #[serde(default)]
    client_to_query_online: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
struct PersistedRelaySettings {
    #[serde(default)]
    qq_to_mc: Option<bool>,
    #[serde(default)]
    mc_to_qq: Option<bool>,
    #[serde(default, alias = "enable_ChatImage_support")]
    enable_chat_image_support: Option<bool>,
    #[serde(default)]
    chunk_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
struct PersistedServerInfoSettings {
    #[serde(default)]
    mcsm_api_addr: Option<String>,
    #[serde(default)]
    mcsm_api_key: Option<String>,
}

pub fn default_relay_config_path() -> PathBuf {
    expand_tilde_path(&PathBuf::from(DEFAULT_RELAY_CONFIG_PATH))
}

fn expand_tilde_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(stripped) = path_str.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }

    if path_str == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }

    path.to_path_buf()
}
