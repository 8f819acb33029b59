//! Adapters for the external geolocation services.
//!
//! Every adapter turns one HTTP lookup into a [`PartialGeo`]. A failed lookup
//! is reported as a [`ProviderError`] and never affects the other providers.

mod ip_api;
mod ipapi_co;
mod ipinfo;

pub use ip_api::IpApi;
pub use ipapi_co::IpapiCo;
pub use ipinfo::Ipinfo;

use crate::config::ProviderConfig;
use crate::types::PartialGeo;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    UnexpectedStatus(StatusCode),
    #[error("provider rejected the lookup: {0}")]
    Rejected(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Stable identifier used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn lookup(&self, ip: &str) -> Result<PartialGeo, ProviderError>;
}

/// Builds the configured providers in priority order.
pub fn from_config(
    configs: &[ProviderConfig],
    client: &reqwest::Client,
) -> Vec<Arc<dyn GeoProvider>> {
    configs
        .iter()
        .map(|config| -> Arc<dyn GeoProvider> {
            match config {
                ProviderConfig::IpApi { base_url, lang } => Arc::new(IpApi::new(
                    client.clone(),
                    base_url.clone(),
                    lang.clone(),
                )),
                ProviderConfig::Ipinfo { base_url, token } => Arc::new(Ipinfo::new(
                    client.clone(),
                    base_url.clone(),
                    token.clone(),
                )),
                ProviderConfig::IpapiCo { base_url } => {
                    Arc::new(IpapiCo::new(client.clone(), base_url.clone()))
                }
            }
        })
        .collect()
}

/// Appends path segments to a base URL, keeping any path the base already has.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ProviderError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: Url,
) -> Result<T, ProviderError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(ProviderError::UnexpectedStatus(response.status()));
    }

    Ok(response.json::<T>().await?)
}

pub(crate) fn parse_base_url(base_url: Option<Url>, default: &str) -> Url {
    base_url.unwrap_or_else(|| Url::parse(default).expect("static URL is valid"))
}
