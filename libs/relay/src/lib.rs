pub mod bridge;
pub mod chunking;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod gateway;
pub mod messages;
pub mod onebot;
pub mod relay;
pub mod resolver;
pub mod runtime;
pub mod sanitizer;
pub mod server_info;
pub mod types;

#[cfg(test)]
mod testing;

pub use bridge::{BridgeClient, BridgeEvent};
pub use config::{RelayCliFlags, RelayConfig};
pub use error::{RelayError, ResolveError, ServerInfoError};
pub use gateway::GatewaySink;
pub use onebot::{LoginInfo, OneBotSession};
pub use relay::{Relay, RelayState};
pub use resolver::{HttpMentionResolver, MentionResolver};
pub use runtime::{RelayRuntime, serve};
pub use types::ConnectionStatus;
