use crate::{
    messages::{CLIENT_OFFLINE, STATS_HELP_MESSAGE},
    types::{CommandRequest, Intent},
};

pub const STATS_COMMAND_PREFIX: &str = "!!stats ";
pub const ONLINE_COMMAND: &str = "!!online";

/// `<category> <item>` plus the optional `-bot` flag.
const STATS_ARITY: usize = 2;

/// What the relay should do with a query intent.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Dispatch {
    /// Forward the command to the named bridge client.
    Request(CommandRequest),
    /// Reply to the group instead of dispatching.
    Notice(String),
}

/// Routes query intents to the bridge clients that can answer them.
///
/// Requests are fire-and-forget: the response comes back later as a
/// bridge command event and is matched on its command text, not on any
/// request id, so two identical queries in flight cannot be told apart.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    stats_client: String,
    online_client: String,
}

impl CommandDispatcher {
    pub fn new(stats_client: String, online_client: String) -> Self {
        Self {
            stats_client,
            online_client,
        }
    }

    /// Returns `None` for intents that are not queries.
    pub fn dispatch(&self, intent: &Intent, client_online: bool) -> Option<Dispatch> {
        match intent {
            Intent::Stats { args, wants_bot } => {
                Some(self.dispatch_stats(args, *wants_bot, client_online))
            }
            Intent::Online => Some(self.dispatch_online(client_online)),
            _ => None,
        }
    }

    pub fn dispatch_stats(
        &self,
        args: &[String],
        wants_bot: bool,
        client_online: bool,
    ) -> Dispatch {
        let expected = STATS_ARITY + usize::from(wants_bot);
        if args.len() != expected {
            return Dispatch::Notice(STATS_HELP_MESSAGE.to_string());
        }

        if !client_online {
            return Dispatch::Notice(CLIENT_OFFLINE.to_string());
        }

        Dispatch::Request(CommandRequest {
            target_client: self.stats_client.clone(),
            command: format!("{STATS_COMMAND_PREFIX}rank {}", args.join(" ")),
            awaits_response: true,
        })
    }

    pub fn dispatch_online(&self, client_online: bool) -> Dispatch {
        if !client_online {
            return Dispatch::Notice(CLIENT_OFFLINE.to_string());
        }

        Dispatch::Request(CommandRequest {
            target_client: self.online_client.clone(),
            command: ONLINE_COMMAND.to_string(),
            awaits_response: true,
        })
    }
}
