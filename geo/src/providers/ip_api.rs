use super::{GeoProvider, ProviderError, endpoint, get_json, parse_base_url};
use crate::types::{PartialGeo, known, known_coordinate, split_asn};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://ip-api.com";
const FIELDS: &str =
    "status,message,country,regionName,city,zip,lat,lon,isp,org,as,proxy,hosting,query";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    query: Option<String>,
    country: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    zip: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    isp: Option<String>,
    org: Option<String>,
    #[serde(rename = "as")]
    autonomous_system: Option<String>,
    proxy: Option<bool>,
    hosting: Option<bool>,
}

/// ip-api.com JSON endpoint. The only provider that reports proxy and
/// hosting flags.
pub struct IpApi {
    client: reqwest::Client,
    base_url: Url,
    lang: Option<String>,
}

impl IpApi {
    pub fn new(client: reqwest::Client, base_url: Option<Url>, lang: Option<String>) -> Self {
        IpApi {
            client,
            base_url: parse_base_url(base_url, DEFAULT_BASE_URL),
            lang,
        }
    }
}

#[async_trait]
impl GeoProvider for IpApi {
    fn name(&self) -> &'static str {
        "ip_api"
    }

    async fn lookup(&self, ip: &str) -> Result<PartialGeo, ProviderError> {
        let mut url = endpoint(&self.base_url, &["json", ip])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("fields", FIELDS);
            if let Some(lang) = &self.lang {
                query.append_pair("lang", lang);
            }
        }

        let data: IpApiResponse = get_json(&self.client, url).await?;

        if data.status != "success" {
            return Err(ProviderError::Rejected(
                data.message.unwrap_or(data.status),
            ));
        }

        let (asn, _) = split_asn(data.autonomous_system.as_deref());

        Ok(PartialGeo {
            ip: known(data.query.as_deref()),
            country: known(data.country.as_deref()),
            region: known(data.region_name.as_deref()),
            city: known(data.city.as_deref()),
            postal: known(data.zip.as_deref()),
            latitude: known_coordinate(data.lat),
            longitude: known_coordinate(data.lon),
            isp: known(data.isp.as_deref()),
            org: known(data.org.as_deref()),
            asn,
            is_proxy: data.proxy,
            is_hosting: data.hosting,
        })
    }
}
