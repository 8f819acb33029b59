use crate::config::Config;
use crate::merge::{MergePolicy, merge};
use crate::metrics_defs::{PROVIDER_LOOKUP, PUBLIC_IP_LOOKUP, RESOLVE_DURATION};
use crate::providers::{self, GeoProvider, ProviderError};
use crate::public_ip::{PublicIpResolver, needs_public_lookup};
use crate::types::{GeoRecord, PartialGeo};
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

#[derive(thiserror::Error, Debug)]
pub enum GeoError {
    #[error("could not build HTTP client: {0}")]
    ClientError(#[from] reqwest::Error),
}

/// Resolves an address against every configured provider and merges the
/// answers. Resolution never fails; unreachable providers only make the
/// result less complete.
pub struct GeoResolver {
    providers: Vec<Arc<dyn GeoProvider>>,
    public_ip: Option<PublicIpResolver>,
    policy: MergePolicy,
    timeout: Duration,
}

impl GeoResolver {
    pub fn new(
        providers: Vec<Arc<dyn GeoProvider>>,
        public_ip: Option<PublicIpResolver>,
        policy: MergePolicy,
        timeout: Duration,
    ) -> Self {
        GeoResolver {
            providers,
            public_ip,
            policy,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, GeoError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let public_ip = config
            .public_ip
            .enabled
            .then(|| PublicIpResolver::new(client.clone(), config.public_ip.url.clone(), timeout));

        Ok(GeoResolver::new(
            providers::from_config(&config.providers, &client),
            public_ip,
            config.merge,
            timeout,
        ))
    }

    pub async fn resolve(&self, ip: &str) -> GeoRecord {
        let start = Instant::now();

        let ip = self.lookup_address(ip).await;
        let partials = self.query_providers(&ip).await;
        let record = merge(&ip, &partials, &self.policy);

        histogram!(RESOLVE_DURATION).record(start.elapsed().as_secs_f64());
        tracing::debug!(
            ip = %record.ip,
            country = ?record.country,
            region = ?record.region,
            city = ?record.city,
            "Resolved location"
        );

        record
    }

    /// The address to send to the providers.
    async fn lookup_address(&self, ip: &str) -> String {
        let ip = ip.trim();
        let Some(public_ip) = self.public_ip.as_ref() else {
            return ip.to_string();
        };
        if !needs_public_lookup(ip) {
            return ip.to_string();
        }

        match public_ip.resolve().await {
            Ok(public) => {
                counter!(PUBLIC_IP_LOOKUP, "status" => "success").increment(1);
                tracing::debug!(original = ip, public = %public, "Replaced private address");
                public
            }
            Err(e) => {
                counter!(PUBLIC_IP_LOOKUP, "status" => "failure").increment(1);
                tracing::warn!(error = %e, "Public address lookup failed, using original");
                ip.to_string()
            }
        }
    }

    /// Queries all providers concurrently. The result has one entry per
    /// provider, in priority order; failed providers contribute an empty
    /// entry.
    async fn query_providers(&self, ip: &str) -> Vec<PartialGeo> {
        let mut join_set = JoinSet::new();

        for (index, provider) in self.providers.iter().enumerate() {
            let provider = provider.clone();
            let ip = ip.to_string();
            let timeout = self.timeout;

            join_set.spawn(async move {
                let result = tokio::time::timeout(timeout, provider.lookup(&ip))
                    .await
                    .unwrap_or(Err(ProviderError::Timeout(timeout)));
                (index, provider.name(), result)
            });
        }

        let mut partials = vec![PartialGeo::default(); self.providers.len()];

        while let Some(join_result) = join_set.join_next().await {
            match join_result {
                Ok((index, name, Ok(partial))) => {
                    counter!(PROVIDER_LOOKUP, "provider" => name, "status" => "success")
                        .increment(1);
                    partials[index] = partial;
                }
                Ok((_, name, Err(e))) => {
                    counter!(PROVIDER_LOOKUP, "provider" => name, "status" => "failure")
                        .increment(1);
                    tracing::warn!(provider = name, error = %e, "Geolocation lookup failed");
                }
                Err(e) => tracing::error!("Task panicked: {}", e),
            }
        }

        partials
    }
}
