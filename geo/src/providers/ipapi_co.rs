use super::{GeoProvider, ProviderError, endpoint, get_json, parse_base_url};
use crate::types::{PartialGeo, known, known_coordinate};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://ipapi.co";

#[derive(Deserialize)]
struct IpapiCoResponse {
    ip: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    postal: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    asn: Option<String>,
    org: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

pub struct IpapiCo {
    client: reqwest::Client,
    base_url: Url,
}

impl IpapiCo {
    pub fn new(client: reqwest::Client, base_url: Option<Url>) -> Self {
        IpapiCo {
            client,
            base_url: parse_base_url(base_url, DEFAULT_BASE_URL),
        }
    }
}

#[async_trait]
impl GeoProvider for IpapiCo {
    fn name(&self) -> &'static str {
        "ipapi_co"
    }

    async fn lookup(&self, ip: &str) -> Result<PartialGeo, ProviderError> {
        // The trailing slash is part of the endpoint, the bare path redirects.
        let url = endpoint(&self.base_url, &[ip, "json", ""])?;

        let data: IpapiCoResponse = get_json(&self.client, url).await?;

        if data.error {
            return Err(ProviderError::Rejected(
                data.reason.unwrap_or_else(|| "unspecified error".into()),
            ));
        }

        Ok(PartialGeo {
            ip: known(data.ip.as_deref()),
            country: known(data.country_name.as_deref()),
            region: known(data.region.as_deref()),
            city: known(data.city.as_deref()),
            postal: known(data.postal.as_deref()),
            latitude: known_coordinate(data.latitude),
            longitude: known_coordinate(data.longitude),
            isp: known(data.org.as_deref()),
            org: known(data.org.as_deref()),
            asn: known(data.asn.as_deref()),
            is_proxy: None,
            is_hosting: None,
        })
    }
}
