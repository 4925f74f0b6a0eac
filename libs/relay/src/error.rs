//! Relay error types

use thiserror::Error;

/// Failure of a single relay handler invocation.
///
/// Handlers return these to the per-stream supervisor, which logs them and
/// moves on to the next event.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Inbound frame was not valid JSON or did not match the expected shape
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    /// Mention lookup failed, the whole chat message is dropped
    #[error("mention resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Command result payload could not be decoded
    #[error("invalid result for {command}: {reason}")]
    InvalidResult { command: String, reason: String },

    /// Gateway refused or failed to accept an outbound message
    #[error("gateway send failed: {0}")]
    GatewaySend(String),

    /// Internal network client failed to accept a command or chat line
    #[error("bridge client error: {0}")]
    Bridge(String),
}

/// Errors from the group-member lookup used for `@` mentions.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("member lookup returned status {status}: {message}")]
    Api { status: String, message: String },

    #[error("member {0} has no display name")]
    MissingName(String),
}

/// Errors from the MCSManager remote-services lookup behind `!!info`.
#[derive(Error, Debug)]
pub enum ServerInfoError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {0}")]
    Status(i64),
}
