//! CQ-code rewriting for text leaving the chat group.
//!
//! Rich segments are replaced with bracketed placeholders in a fixed order,
//! `@` mentions are resolved to display names, and HTML entities are decoded
//! last so that escaped brackets in user text never look like CQ codes.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::{error::ResolveError, resolver::MentionResolver};

static IMAGE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[CQ:image,file=.*?\]").ok());
static SHARE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[CQ:share,file=.*?\]").ok());
static FACE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[CQ:face,id=.*?\]").ok());
static RECORD_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[CQ:record,file=.*?\]").ok());
static REPLY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[CQ:reply,id=.*?\]").ok());
static MENTION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[CQ:at,qq=(\d+)\]").ok());

pub const IMAGE_PLACEHOLDER: &str = "[图片]";
pub const SHARE_PLACEHOLDER: &str = "[链接]";
pub const FACE_PLACEHOLDER: &str = "[表情]";
pub const RECORD_PLACEHOLDER: &str = "[语音]";
pub const REPLY_PLACEHOLDER: &str = "[回复]";

/// Rewrite CQ codes in `text` into plain-text placeholders.
///
/// Image codes are kept verbatim when `enable_chat_image_support` is set so
/// that an in-game image renderer can pick them up. Any mention lookup
/// failure aborts the whole message.
pub async fn sanitize(
    text: &str,
    resolver: &dyn MentionResolver,
    enable_chat_image_support: bool,
) -> Result<String, ResolveError> {
    let mut message = text.to_string();

    if !enable_chat_image_support {
        message = replace_all(&IMAGE_PATTERN, &message, IMAGE_PLACEHOLDER);
    }
    message = replace_all(&SHARE_PATTERN, &message, SHARE_PLACEHOLDER);
    message = replace_all(&FACE_PATTERN, &message, FACE_PLACEHOLDER);
    message = replace_all(&RECORD_PATTERN, &message, RECORD_PLACEHOLDER);
    message = replace_all(&REPLY_PATTERN, &message, REPLY_PLACEHOLDER);
    message = resolve_mentions(message, resolver).await?;

    Ok(html_escape::decode_html_entities(&message).into_owned())
}

fn replace_all(pattern: &LazyLock<Option<Regex>>, text: &str, placeholder: &str) -> String {
    match pattern.as_ref() {
        Some(regex) => regex.replace_all(text, NoExpand(placeholder)).into_owned(),
        None => text.to_string(),
    }
}

/// Ids are collected up front and substituted one occurrence at a time, so a
/// display name that happens to contain CQ syntax is never re-resolved.
async fn resolve_mentions(
    message: String,
    resolver: &dyn MentionResolver,
) -> Result<String, ResolveError> {
    let Some(regex) = MENTION_PATTERN.as_ref() else {
        return Ok(message);
    };

    let ids: Vec<String> = regex
        .captures_iter(&message)
        .filter_map(|captures| captures.get(1).map(|id| id.as_str().to_string()))
        .collect();

    let mut message = message;
    for id in ids {
        let name = resolver.resolve(&id).await?;
        let replacement = format!("[@{name}]");
        message = regex
            .replacen(&message, 1, NoExpand(&replacement))
            .into_owned();
    }

    Ok(message)
}
