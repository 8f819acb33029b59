//! Substitutes the service's own public address for visitors that arrive
//! from a private network, e.g. when the service runs behind a local proxy
//! that does not forward the client address.

use crate::providers::ProviderError;
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

/// Whether the address cannot be geolocated as is: loopback, private,
/// link-local, unique-local, unspecified, or not an IP address at all.
pub fn needs_public_lookup(ip: &str) -> bool {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        Ok(IpAddr::V6(v6)) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return needs_public_lookup(&v4.to_string());
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
        Err(_) => true,
    }
}

/// Plain-text "what is my IP" lookup (ipify style).
pub struct PublicIpResolver {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl PublicIpResolver {
    pub fn new(client: reqwest::Client, url: Url, timeout: Duration) -> Self {
        PublicIpResolver {
            client,
            url,
            timeout,
        }
    }

    pub async fn resolve(&self) -> Result<String, ProviderError> {
        let request = async {
            let response = self.client.get(self.url.clone()).send().await?;
            if !response.status().is_success() {
                return Err(ProviderError::UnexpectedStatus(response.status()));
            }
            Ok::<_, ProviderError>(response.text().await?)
        };

        let body = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))??;

        let ip = body.trim();
        match ip.parse::<IpAddr>() {
            Ok(_) => Ok(ip.to_string()),
            Err(_) => Err(ProviderError::Rejected(format!(
                "not an IP address: {ip:.64}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_needs_public_lookup() {
        for ip in [
            "127.0.0.1",
            "10.1.2.3",
            "172.16.0.1",
            "192.168.1.10",
            "169.254.0.1",
            "0.0.0.0",
            "::1",
            "fd00::1",
            "fe80::1",
            "::ffff:192.168.0.1",
            "not-an-ip",
            "",
        ] {
            assert!(needs_public_lookup(ip), "{ip} should need a public lookup");
        }

        for ip in [
            "8.8.8.8",
            "203.0.113.5",
            // Public addresses that merely share a prefix with private ranges
            "172.217.0.1",
            "192.0.2.1",
            "2001:4860::8888",
            "::ffff:8.8.8.8",
        ] {
            assert!(!needs_public_lookup(ip), "{ip} should be looked up as is");
        }
    }

    #[tokio::test]
    async fn test_resolve() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.7\n"))
            .mount(&mock_server)
            .await;

        let resolver = PublicIpResolver::new(
            reqwest::Client::new(),
            Url::parse(&mock_server.uri()).unwrap(),
            Duration::from_secs(2),
        );
        assert_eq!(resolver.resolve().await.unwrap(), "203.0.113.7");
    }

    #[tokio::test]
    async fn test_resolve_garbage() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&mock_server)
            .await;

        let resolver = PublicIpResolver::new(
            reqwest::Client::new(),
            Url::parse(&mock_server.uri()).unwrap(),
            Duration::from_secs(2),
        );
        assert!(matches!(
            resolver.resolve().await,
            Err(ProviderError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("203.0.113.7")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let resolver = PublicIpResolver::new(
            reqwest::Client::new(),
            Url::parse(&mock_server.uri()).unwrap(),
            Duration::from_millis(100),
        );
        assert!(matches!(
            resolver.resolve().await,
            Err(ProviderError::Timeout(_))
        ));
    }
}
