use std::path::{Path, PathBuf};

use cqbridge_relay::{
    OneBotSession, RelayCliFlags, RelayConfig, config::default_relay_config_path,
};

pub async fn handle_init(
    config_path: Option<PathBuf>,
    group_id: Option<i64>,
    access_token: Option<String>,
    force: bool,
) -> Result<(), String> {
    let path = config_path.unwrap_or_else(default_relay_config_path);
    if path.exists() && !force {
        return Err(format!(
            "Relay config already exists at {}. Use --force to overwrite.",
            path.display()
        ));
    }

    let config = init_config(group_id, access_token);

    config
        .validate()
        .map_err(|error| format!("Invalid relay config: {error}"))?;
    config
        .save(Some(&path))
        .map_err(|error| format!("Failed to save relay config: {error}"))?;

    println!("✓ Relay config saved to {}", path.display());
    Ok(())
}

fn init_config(group_id: Option<i64>, access_token: Option<String>) -> RelayConfig {
    let mut config = RelayConfig::default();

    if let Some(group_id) = group_id {
        config.gateway.react_group_id = group_id;
    }
    if let Some(token) = access_token.and_then(clean_token) {
        config.gateway.access_token = token;
    }

    config
}

pub async fn handle_check(config_path: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(config_path.as_deref())?;

    for line in summary_lines(&config) {
        println!("{line}");
    }
    println!("✓ Relay config is valid");
    Ok(())
}

pub async fn handle_probe(config_path: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(config_path.as_deref())?;

    let login = OneBotSession::probe(&config.gateway_url())
        .await
        .map_err(|error| format!("OneBot probe failed: {error}"))?;

    println!(
        "✓ Connected to ws://{}:{}/ as {} ({})",
        config.gateway.ws_address, config.gateway.ws_port, login.nickname, login.user_id
    );
    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<RelayConfig, String> {
    RelayConfig::load(config_path, &RelayCliFlags::default())
        .map_err(|error| format!("Failed to load relay config: {error}"))
}

fn summary_lines(config: &RelayConfig) -> Vec<String> {
    vec![
        format!(
            "gateway        ws://{}:{}/",
            config.gateway.ws_address, config.gateway.ws_port
        ),
        format!(
            "access token   {}",
            configured_text(!config.gateway.access_token.is_empty())
        ),
        format!("member lookup  {}", config.member_info_base_url()),
        format!("group          {}", config.gateway.react_group_id),
        format!("stats client   {}", config.bridge.client_to_query_stats),
        format!("online client  {}", config.bridge.client_to_query_online),
        format!(
            "relay          qq_to_mc={} mc_to_qq={} images={}",
            config.relay.qq_to_mc, config.relay.mc_to_qq, config.relay.enable_chat_image_support
        ),
        format!("chunk limit    {}", config.relay.chunk_limit),
        format!(
            "server info    {}",
            configured_text(config.has_server_info())
        ),
    ]
}

fn configured_text(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "not configured"
    }
}

fn clean_token(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
