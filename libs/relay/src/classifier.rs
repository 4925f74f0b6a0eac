use crate::types::{EventKind, GatewayEvent, Intent, ScopeKind};

/// Settings the classifier needs from the relay configuration.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    pub react_group_id: i64,
    pub qq_to_mc: bool,
}

/// True when the event is a non-anonymous message in the configured group.
pub fn is_eligible(event: &GatewayEvent, react_group_id: i64) -> bool {
    event.event_kind() == EventKind::Message
        && event.scope_kind() == ScopeKind::Group
        && !event.is_anonymous()
        && event.group_id == Some(react_group_id)
}

/// Classify an event into every intent it matches.
///
/// Rules are evaluated independently, so a single message can produce more
/// than one intent (with `qq_to_mc` enabled, `!!online` is both relayed as
/// chat and dispatched as a query). Returns `[Intent::Ignore]` when nothing
/// matched or the event is not eligible.
pub fn classify(event: &GatewayEvent, config: ClassifierConfig) -> Vec<Intent> {
    if !is_eligible(event, config.react_group_id) {
        return vec![Intent::Ignore];
    }

    let raw = event.raw_text();
    let args: Vec<&str> = raw.split(' ').collect();
    let first = args.first().copied().unwrap_or_default();
    let single = |command: &str| args.len() == 1 && first == command;

    let mut intents = Vec::new();

    if single("!!help") {
        intents.push(Intent::Help);
    }

    if single("!!ping") {
        intents.push(Intent::Ping);
    }

    if first == "!!mc" || (config.qq_to_mc && !args.is_empty()) {
        intents.push(Intent::Chat {
            text: raw.to_string(),
            sender: event.sender_display_name(),
        });
    }

    if single("!!info") {
        intents.push(Intent::Info);
    }

    if single("!!online") {
        intents.push(Intent::Online);
    }

    if first == "!!stats" {
        let rest: Vec<String> = args.iter().skip(1).map(|arg| arg.to_string()).collect();
        let wants_bot = args.contains(&"-bot");
        intents.push(Intent::Stats {
            args: rest,
            wants_bot,
        });
    }

    if intents.is_empty() {
        intents.push(Intent::Ignore);
    }

    intents
}
