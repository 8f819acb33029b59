//! The two identity provider calls: code exchange and user info.

use crate::config::OAuthConfig;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const AVATAR_CDN: &str = "https://cdn.discordapp.com/avatars/";

#[derive(thiserror::Error, Debug)]
pub enum OAuthError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("identity provider returned {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("invalid identity provider URL: {0}")]
    InvalidUrl(String),
}

#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// The subset of `/users/@me` that is recorded.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub discriminator: Option<String>,
    pub email: Option<String>,
    pub locale: Option<String>,
    pub verified: Option<bool>,
    pub mfa_enabled: Option<bool>,
    pub avatar: Option<String>,
}

impl User {
    pub fn avatar_url(&self) -> Option<String> {
        let avatar = self.avatar.as_deref()?;
        let mut url = Url::parse(AVATAR_CDN).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend([self.id.as_str(), &format!("{avatar}.png")]);
        Some(url.into())
    }
}

pub struct OAuthClient {
    client: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(OAuthClient { client, config })
    }

    /// Where `/login` sends the visitor.
    pub fn authorize_url(&self) -> Url {
        let mut url = self.config.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "));
        url
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(self.config.token_url.clone())
            .form(&form)
            .send()
            .await?;

        Ok(check(response).await?.json::<TokenResponse>().await?)
    }

    pub async fn fetch_user(&self, access_token: &str) -> Result<User, OAuthError> {
        let mut url = self.config.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OAuthError::InvalidUrl(self.config.api_base_url.to_string()))?
            .pop_if_empty()
            .extend(["users", "@me"]);

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;

        Ok(check(response).await?.json::<User>().await?)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, OAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(OAuthError::UnexpectedStatus { status, body })
}
