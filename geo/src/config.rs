use crate::merge::MergePolicy;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Upper bound on configured providers. Beyond three the merge policy has no
/// tie-breaking rules.
pub const MAX_PROVIDERS: usize = 3;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("At least one geolocation provider must be configured")]
    NoProviders,

    #[error("At most {MAX_PROVIDERS} geolocation providers are supported, got {0}")]
    TooManyProviders(usize),

    #[error("Duplicate geolocation provider: {0}")]
    DuplicateProvider(&'static str),

    #[error("Provider timeout cannot be 0")]
    ZeroTimeout,
}

/// A geolocation provider and its settings. The order of the configured
/// list is the merge priority.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum ProviderConfig {
    IpApi {
        base_url: Option<Url>,
        /// Response language, e.g. `ja`.
        lang: Option<String>,
    },
    Ipinfo {
        base_url: Option<Url>,
        #[serde(default)]
        token: String,
    },
    IpapiCo {
        base_url: Option<Url>,
    },
}

impl ProviderConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::IpApi { .. } => "ip_api",
            ProviderConfig::Ipinfo { .. } => "ipinfo",
            ProviderConfig::IpapiCo { .. } => "ipapi_co",
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PublicIpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_public_ip_url")]
    pub url: Url,
}

impl Default for PublicIpConfig {
    fn default() -> Self {
        PublicIpConfig {
            enabled: true,
            url: default_public_ip_url(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub providers: Vec<ProviderConfig>,
    /// Per provider request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub public_ip: PublicIpConfig,
    #[serde(default)]
    pub merge: MergePolicy,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.providers.is_empty() {
            return Err(ValidationError::NoProviders);
        }

        if self.providers.len() > MAX_PROVIDERS {
            return Err(ValidationError::TooManyProviders(self.providers.len()));
        }

        let mut names = HashSet::new();
        for provider in &self.providers {
            if !names.insert(provider.name()) {
                return Err(ValidationError::DuplicateProvider(provider.name()));
            }
        }

        if self.timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_public_ip_url() -> Url {
    Url::parse("https://api.ipify.org").expect("static URL is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
providers:
    - type: ip_api
      lang: ja
    - type: ipinfo
      token: secret
    - type: ipapi_co
      base_url: "http://127.0.0.1:9000"
timeout_ms: 2000
merge:
    region_consensus: false
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.providers.len(), 3);
        assert_eq!(
            config.providers[0],
            ProviderConfig::IpApi {
                base_url: None,
                lang: Some("ja".into())
            }
        );
        assert_eq!(config.providers[1].name(), "ipinfo");
        assert_eq!(config.timeout_ms, 2000);
        assert!(!config.merge.region_consensus);
        assert!(config.public_ip.enabled);
        assert_eq!(config.public_ip.url.as_str(), "https://api.ipify.org/");
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("providers: [{type: ip_api}]").unwrap();
        assert_eq!(config.timeout_ms, 3000);
        assert!(config.merge.region_consensus);
        assert_eq!(config.public_ip, PublicIpConfig::default());
    }

    #[test]
    fn test_validation_errors() {
        let base_config: Config =
            serde_yaml::from_str("providers: [{type: ip_api}, {type: ipinfo}]").unwrap();

        let mut config = base_config.clone();
        config.providers.clear();
        assert_eq!(config.validate(), Err(ValidationError::NoProviders));

        let mut config = base_config.clone();
        config.providers.push(ProviderConfig::IpapiCo { base_url: None });
        config.providers.push(ProviderConfig::IpapiCo { base_url: None });
        assert_eq!(config.validate(), Err(ValidationError::TooManyProviders(4)));

        let mut config = base_config.clone();
        config.providers.push(ProviderConfig::IpApi {
            base_url: None,
            lang: None,
        });
        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateProvider("ip_api"))
        );

        let mut config = base_config;
        config.timeout_ms = 0;
        assert_eq!(config.validate(), Err(ValidationError::ZeroTimeout));
    }

    #[test]
    fn test_deserialization_errors() {
        // Unknown provider type
        assert!(serde_yaml::from_str::<Config>("providers: [{type: maxmind}]").is_err());

        // Invalid URL
        assert!(
            serde_yaml::from_str::<Config>(
                r#"providers: [{type: ip_api, base_url: "not-a-url"}]"#
            )
            .is_err()
        );

        // Missing providers
        assert!(serde_yaml::from_str::<Config>("timeout_ms: 100").is_err());
    }
}
