use crate::{
    dispatcher::{ONLINE_COMMAND, STATS_COMMAND_PREFIX},
    error::RelayError,
    messages::{ONLINE_HEADER, STATS_NOT_FOUND, STATS_PLUGIN_NOT_LOADED, STATS_TOTAL_LABEL},
    types::{CommandPayload, OnlineQueryResult, QueryResult, StatsQueryResult},
};

const STATS_ERROR_NOT_FOUND: i64 = 1;
const STATS_ERROR_PLUGIN_NOT_LOADED: i64 = 2;

/// Decode the typed result of a responded command.
///
/// The result shape is picked from the command text, so only commands this
/// relay issues are recognised. Returns `Ok(None)` for anything else.
pub fn decode_result(payload: &CommandPayload) -> Result<Option<QueryResult>, RelayError> {
    let value = payload.result.clone().unwrap_or_default();
    let invalid = |error: serde_json::Error| RelayError::InvalidResult {
        command: payload.command.clone(),
        reason: error.to_string(),
    };

    if payload.command.starts_with(STATS_COMMAND_PREFIX) {
        let result: StatsQueryResult = serde_json::from_value(value).map_err(invalid)?;
        return Ok(Some(QueryResult::Stats(result)));
    }

    if payload.command == ONLINE_COMMAND {
        let result: OnlineQueryResult = serde_json::from_value(value).map_err(invalid)?;
        return Ok(Some(QueryResult::Online(result)));
    }

    Ok(None)
}

/// Render a command response as group text.
///
/// `Ok(None)` means there is nothing to send: the payload is a request
/// rather than a response, the command is not one of ours, or the stats
/// error code has no user-facing message.
pub fn format_response(payload: &CommandPayload) -> Result<Option<String>, RelayError> {
    if !payload.responded {
        return Ok(None);
    }

    let Some(result) = decode_result(payload)? else {
        return Ok(None);
    };

    Ok(render(&result))
}

pub fn render(result: &QueryResult) -> Option<String> {
    match result {
        QueryResult::Stats(stats) => render_stats(stats),
        QueryResult::Online(online) => Some(render_online(online)),
    }
}

fn render_stats(result: &StatsQueryResult) -> Option<String> {
    if result.success {
        let mut lines = Vec::with_capacity(result.data.len() + 2);
        lines.push(format!("====== {} ======", result.stats_name));
        lines.extend(result.data.iter().cloned());
        lines.push(format!("{STATS_TOTAL_LABEL}{}", result.total));
        return Some(lines.join("\n"));
    }

    match result.error_code {
        Some(STATS_ERROR_NOT_FOUND) => Some(STATS_NOT_FOUND.to_string()),
        Some(STATS_ERROR_PLUGIN_NOT_LOADED) => Some(STATS_PLUGIN_NOT_LOADED.to_string()),
        _ => None,
    }
}

fn render_online(result: &OnlineQueryResult) -> String {
    let mut lines = Vec::with_capacity(result.data.len() + 1);
    lines.push(ONLINE_HEADER.to_string());
    lines.extend(result.data.iter().cloned());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::format_response;
    use crate::error::RelayError;
    use crate::types::CommandPayload;

    fn responded(command: &str, result: serde_json::Value) -> CommandPayload {
        CommandPayload {
            command: command.to_string(),
            responded: true,
            result: Some(result),
        }
    }

    fn format(payload: &CommandPayload) -> Option<String> {
        match format_response(payload) {
            Ok(value) => value,
            Err(error) => panic!("format failed: {error}"),
        }
    }

    #[test]
    fn stats_success_renders_title_rows_and_total() {
        let payload = responded(
            "!!stats rank used diamond_pickaxe",
            json!({
                "success": true,
                "stats_name": "used.diamond_pickaxe",
                "data": ["Alice: 5", "Bob: 3"],
                "total": 8
            }),
        );

        let Some(text) = format(&payload) else {
            panic!("expected rendered stats");
        };
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "====== used.diamond_pickaxe ======",
                "Alice: 5",
                "Bob: 3",
                "总数：8"
            ]
        );
    }

    #[test]
    fn stats_error_codes() {
        let not_found = responded(
            "!!stats rank used x",
            json!({"success": false, "error_code": 1}),
        );
        assert_eq!(format(&not_found).as_deref(), Some("统计信息未找到"));

        let not_loaded = responded(
            "!!stats rank used x",
            json!({"success": false, "error_code": 2}),
        );
        assert_eq!(format(&not_loaded).as_deref(), Some("StatsHelper 插件未加载"));
    }

    #[test]
    fn unknown_or_missing_error_code_is_silent() {
        let unknown = responded(
            "!!stats rank used x",
            json!({"success": false, "error_code": 3}),
        );
        assert_eq!(format(&unknown), None);

        let absent = responded("!!stats rank used x", json!({"success": false}));
        assert_eq!(format(&absent), None);
    }

    #[test]
    fn online_renders_header_and_players() {
        let payload = responded("!!online", json!({"data": ["Survival: Steve, Alex"]}));
        assert_eq!(
            format(&payload).as_deref(),
            Some("====== 玩家列表 ======\nSurvival: Steve, Alex")
        );
    }

    #[test]
    fn unanswered_payload_is_ignored() {
        let payload = CommandPayload {
            command: "!!online".to_string(),
            responded: false,
            result: None,
        };
        assert_eq!(format(&payload), None);
    }

    #[test]
    fn unrelated_command_is_ignored() {
        let payload = responded("!!qb make", json!({"anything": true}));
        assert_eq!(format(&payload), None);
    }

    #[test]
    fn malformed_result_is_an_error() {
        let payload = responded("!!online", json!({"data": "not a list"}));
        assert!(matches!(
            format_response(&payload),
            Err(RelayError::InvalidResult { command, .. }) if command == "!!online"
        ));
    }
}
