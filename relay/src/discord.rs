use crate::config::Config;
use crate::platform::{ChatPlatform, Delivery, DeliveryError};
use crate::task::LogMessage;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use std::time::Duration;
use url::Url;

const AUDIT_LOG_REASON: &str = "X-Audit-Log-Reason";

#[derive(Serialize)]
struct Thumbnail<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: &'a str,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<Thumbnail<'a>>,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    embeds: [Embed<'a>; 1],
}

#[derive(Serialize)]
struct AddGuildMember<'a> {
    access_token: &'a str,
}

/// Discord REST client authenticated as the bot.
pub struct DiscordClient {
    client: reqwest::Client,
    api_base_url: Url,
    bot_token: String,
    log_channel_id: Option<u64>,
    guild_id: Option<u64>,
    role_id: Option<u64>,
    role_reason: String,
}

impl DiscordClient {
    pub fn new(config: &Config) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(DiscordClient {
            client,
            api_base_url: config.api_base_url.clone(),
            bot_token: config.bot_token.clone(),
            log_channel_id: config.log_channel_id,
            guild_id: config.guild_id,
            role_id: config.role_id,
            role_reason: config.role_reason.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, DeliveryError> {
        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DeliveryError::InvalidUrl(self.api_base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    async fn check(response: reqwest::Response) -> Result<Delivery, DeliveryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(Delivery::Sent);
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::UnexpectedStatus { status, body })
    }
}

fn parse_user_id(user_id: &str) -> Result<u64, DeliveryError> {
    user_id
        .trim()
        .parse::<u64>()
        .map_err(|_| DeliveryError::InvalidUserId(user_id.to_string()))
}

/// Discord reads the audit log reason as URL-encoded UTF-8, which also keeps
/// the header value ASCII.
fn audit_log_reason(reason: &str) -> String {
    // A literal '+' is encoded as %2B, so any '+' left stands for a space.
    url::form_urlencoded::byte_serialize(reason.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn send_log(&self, message: &LogMessage) -> Result<Delivery, DeliveryError> {
        let Some(channel_id) = self.log_channel_id else {
            return Ok(Delivery::Skipped("log channel not configured"));
        };

        let body = CreateMessage {
            embeds: [Embed {
                title: &message.title,
                description: &message.description,
                color: message.color,
                thumbnail: message
                    .thumbnail_url
                    .as_deref()
                    .map(|url| Thumbnail { url }),
            }],
        };

        let url = self.url(&["channels", &channel_id.to_string(), "messages"])?;
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.authorization())
            .json(&body)
            .send()
            .await?;

        Self::check(response).await
    }

    async fn assign_role(&self, user_id: &str) -> Result<Delivery, DeliveryError> {
        let (Some(guild_id), Some(role_id)) = (self.guild_id, self.role_id) else {
            return Ok(Delivery::Skipped("guild or role not configured"));
        };
        let user_id = parse_user_id(user_id)?;

        let url = self.url(&[
            "guilds",
            &guild_id.to_string(),
            "members",
            &user_id.to_string(),
            "roles",
            &role_id.to_string(),
        ])?;

        let response = self
            .client
            .put(url)
            .header(AUTHORIZATION, self.authorization())
            .header(AUDIT_LOG_REASON, audit_log_reason(&self.role_reason))
            .send()
            .await?;
        let delivery = Self::check(response).await?;
        tracing::info!(user_id, role_id, "Granted verified role");
        Ok(delivery)
    }

    async fn join_guild(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Delivery, DeliveryError> {
        let Some(guild_id) = self.guild_id else {
            return Ok(Delivery::Skipped("guild not configured"));
        };
        let user_id = parse_user_id(user_id)?;

        let url = self.url(&[
            "guilds",
            &guild_id.to_string(),
            "members",
            &user_id.to_string(),
        ])?;

        // 201 when added, 204 when the user already is a member
        let response = self
            .client
            .put(url)
            .header(AUTHORIZATION, self.authorization())
            .json(&AddGuildMember { access_token })
            .send()
            .await?;

        Self::check(response).await
    }
}
