use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::ResolveError;

/// Maps a numeric member id from an `@` mention to a display name.
#[async_trait]
pub trait MentionResolver: Send + Sync {
    async fn resolve(&self, user_id: &str) -> Result<String, ResolveError>;
}

/// Looks members up through the OneBot HTTP API (`get_group_member_info`).
#[derive(Debug, Clone)]
pub struct HttpMentionResolver {
    base_url: String,
    group_id: i64,
    access_token: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    status: String,
    #[serde(default)]
    retcode: i64,
    data: Option<T>,
    #[serde(default)]
    wording: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberInfo {
    #[serde(default)]
    card: String,
    #[serde(default)]
    nickname: String,
}

impl HttpMentionResolver {
    pub fn new(base_url: String, group_id: i64, access_token: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            group_id,
            access_token,
            http: reqwest::Client::new(),
        }
    }

    pub fn member_info_url(&self, user_id: &str) -> String {
        let mut url = format!(
            "{}/get_group_member_info?group_id={}&user_id={user_id}&no_cache=true",
            self.base_url, self.group_id
        );
        if !self.access_token.is_empty() {
            url.push_str(&format!("&access_token={}", self.access_token));
        }
        url
    }
}

#[async_trait]
impl MentionResolver for HttpMentionResolver {
    async fn resolve(&self, user_id: &str) -> Result<String, ResolveError> {
        let url = self.member_info_url(user_id);
        debug!(user_id, "looking up group member");

        let response: ApiResponse<MemberInfo> =
            self.http.get(url).send().await?.error_for_status()?.json().await?;

        member_display_name(user_id, response)
    }
}

fn member_display_name(
    user_id: &str,
    response: ApiResponse<MemberInfo>,
) -> Result<String, ResolveError> {
    if response.retcode != 0 || response.status == "failed" {
        return Err(ResolveError::Api {
            status: response.status,
            message: response.wording.unwrap_or_default(),
        });
    }

    let Some(member) = response.data else {
        return Err(ResolveError::MissingName(user_id.to_string()));
    };

    if member.card.is_empty() {
        Ok(member.nickname)
    } else {
        Ok(member.card)
    }
}
