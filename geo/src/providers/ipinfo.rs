use super::{GeoProvider, ProviderError, endpoint, get_json, parse_base_url};
use crate::types::{PartialGeo, known, known_coordinate, split_asn};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://ipinfo.io";

#[derive(Deserialize)]
struct IpinfoResponse {
    ip: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
    postal: Option<String>,
    /// `"lat,lon"`
    loc: Option<String>,
    /// `"AS2516 KDDI CORPORATION"`
    org: Option<String>,
    #[serde(default)]
    bogon: bool,
}

pub struct Ipinfo {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl Ipinfo {
    pub fn new(client: reqwest::Client, base_url: Option<Url>, token: String) -> Self {
        Ipinfo {
            client,
            base_url: parse_base_url(base_url, DEFAULT_BASE_URL),
            token,
        }
    }
}

fn parse_loc(loc: Option<&str>) -> (Option<f64>, Option<f64>) {
    let Some((lat, lon)) = loc.and_then(|loc| loc.split_once(',')) else {
        return (None, None);
    };
    match (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) {
        (Ok(lat), Ok(lon)) => (known_coordinate(Some(lat)), known_coordinate(Some(lon))),
        _ => (None, None),
    }
}

#[async_trait]
impl GeoProvider for Ipinfo {
    fn name(&self) -> &'static str {
        "ipinfo"
    }

    async fn lookup(&self, ip: &str) -> Result<PartialGeo, ProviderError> {
        let mut url = endpoint(&self.base_url, &[ip, "json"])?;
        if !self.token.is_empty() {
            url.query_pairs_mut().append_pair("token", &self.token);
        }

        let data: IpinfoResponse = get_json(&self.client, url).await?;

        if data.bogon {
            return Err(ProviderError::Rejected("bogon address".into()));
        }

        let (latitude, longitude) = parse_loc(data.loc.as_deref());
        let (asn, holder) = split_asn(data.org.as_deref());

        // No proxy or hosting detection on this plan, leave the flags unknown.
        Ok(PartialGeo {
            ip: known(data.ip.as_deref()),
            country: known(data.country.as_deref()),
            region: known(data.region.as_deref()),
            city: known(data.city.as_deref()),
            postal: known(data.postal.as_deref()),
            latitude,
            longitude,
            isp: holder.clone(),
            org: holder,
            asn,
            is_proxy: None,
            is_hosting: None,
        })
    }
}
