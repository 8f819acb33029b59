use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Bot token cannot be empty")]
    EmptyBotToken,

    #[error("Request timeout cannot be 0")]
    ZeroTimeout,
}

/// Discord bot settings. Ids left unset disable the matching task kind.
#[derive(Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: Url,
    pub bot_token: String,
    pub log_channel_id: Option<u64>,
    pub guild_id: Option<u64>,
    pub role_id: Option<u64>,
    /// Audit log reason attached to role grants.
    #[serde(default = "default_role_reason")]
    pub role_reason: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bot_token.trim().is_empty() {
            return Err(ValidationError::EmptyBotToken);
        }

        if self.timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }

        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("bot_token", &"<redacted>")
            .field("log_channel_id", &self.log_channel_id)
            .field("guild_id", &self.guild_id)
            .field("role_id", &self.role_id)
            .field("role_reason", &self.role_reason)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

fn default_api_base_url() -> Url {
    Url::parse("https://discord.com/api/v10").expect("static URL is valid")
}

fn default_role_reason() -> String {
    "Passed verification".into()
}

fn default_timeout_ms() -> u64 {
    5000
}
