use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Listener port cannot be 0")]
    ZeroPort,

    #[error("Listener and admin listener cannot share {0}:{1}")]
    ListenerConflict(String, u16),

    #[error("OAuth client id cannot be empty")]
    EmptyClientId,

    #[error("At least one OAuth scope must be requested")]
    NoScopes,

    #[error("Guild join requires the guilds.join scope")]
    MissingJoinScope,

    #[error("OAuth timeout cannot be 0")]
    ZeroTimeout,

    #[error("Access log path cannot be empty")]
    EmptyAccessLogPath,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::ZeroPort);
        }
        Ok(())
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

fn default_admin_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 5001,
    }
}

/// Identity provider application settings.
#[derive(Clone, Deserialize, PartialEq)]
pub struct OAuthConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub redirect_uri: Url,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: Url,
    #[serde(default = "default_token_url")]
    pub token_url: Url,
    /// Base of the user-info endpoint (`/users/@me`).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: Url,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("authorize_url", &self.authorize_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("api_base_url", &self.api_base_url.as_str())
            .field("scopes", &self.scopes)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    pub oauth: OAuthConfig,
    /// JSON file holding every visitor's history.
    #[serde(default = "default_access_log")]
    pub access_log: PathBuf,
    /// Also add verified visitors to the guild with their own token.
    #[serde(default)]
    pub join_guild: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::ListenerConflict(
                self.listener.host.clone(),
                self.listener.port,
            ));
        }

        if self.oauth.client_id.trim().is_empty() {
            return Err(ValidationError::EmptyClientId);
        }

        if self.oauth.scopes.is_empty() {
            return Err(ValidationError::NoScopes);
        }

        if self.join_guild && !self.oauth.scopes.iter().any(|s| s == "guilds.join") {
            return Err(ValidationError::MissingJoinScope);
        }

        if self.oauth.timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }

        if self.access_log.as_os_str().is_empty() {
            return Err(ValidationError::EmptyAccessLogPath);
        }

        Ok(())
    }
}

fn default_authorize_url() -> Url {
    Url::parse("https://discord.com/oauth2/authorize").expect("static URL is valid")
}

fn default_token_url() -> Url {
    Url::parse("https://discord.com/api/oauth2/token").expect("static URL is valid")
}

fn default_api_base_url() -> Url {
    Url::parse("https://discord.com/api/v10").expect("static URL is valid")
}

fn default_scopes() -> Vec<String> {
    vec!["identify".into(), "email".into()]
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_access_log() -> PathBuf {
    PathBuf::from("access_log.json")
}
