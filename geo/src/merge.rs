//! Merging of per-provider results into one [`GeoRecord`].
//!
//! Results are folded in provider priority order:
//! - Every field takes the first known value and is never overwritten.
//! - Coordinates are taken as a pair from the first provider that has both,
//!   so latitude and longitude never come from different providers.
//! - With region consensus enabled, a region reported by exactly two
//!   providers is only kept when both agree.

use crate::types::{GeoRecord, PartialGeo};
use serde::Deserialize;
use url::Url;

const MAPS_COORDINATES_BASE: &str = "https://www.google.com/maps";
const MAPS_SEARCH_BASE: &str = "https://www.google.com/maps/search/";

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct MergePolicy {
    /// Require two reporting providers to agree on the region.
    #[serde(default = "default_region_consensus")]
    pub region_consensus: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy {
            region_consensus: default_region_consensus(),
        }
    }
}

fn default_region_consensus() -> bool {
    true
}

/// Merges provider results, highest priority first. `ip` is used when no
/// provider echoed the address back.
pub fn merge(ip: &str, partials: &[PartialGeo], policy: &MergePolicy) -> GeoRecord {
    let partials: Vec<PartialGeo> = partials.iter().map(PartialGeo::normalized).collect();

    let mut merged = PartialGeo::default();
    for partial in &partials {
        fill(&mut merged.ip, &partial.ip);
        fill(&mut merged.country, &partial.country);
        fill(&mut merged.region, &partial.region);
        fill(&mut merged.city, &partial.city);
        fill(&mut merged.postal, &partial.postal);
        fill(&mut merged.isp, &partial.isp);
        fill(&mut merged.org, &partial.org);
        fill(&mut merged.asn, &partial.asn);
        fill(&mut merged.is_proxy, &partial.is_proxy);
        fill(&mut merged.is_hosting, &partial.is_hosting);
    }

    match partials
        .iter()
        .find_map(|p| p.latitude.zip(p.longitude))
    {
        Some((latitude, longitude)) => {
            merged.latitude = Some(latitude);
            merged.longitude = Some(longitude);
        }
        None => {
            for partial in &partials {
                fill(&mut merged.latitude, &partial.latitude);
                fill(&mut merged.longitude, &partial.longitude);
            }
        }
    }

    if policy.region_consensus {
        let regions: Vec<&str> = partials.iter().filter_map(|p| p.region.as_deref()).collect();
        if let [first, second] = regions.as_slice()
            && !same_place(first, second)
        {
            tracing::debug!(first, second, "Providers disagree on region");
            merged.region = None;
        }
    }

    let mut record = GeoRecord {
        ip: merged.ip.unwrap_or_else(|| ip.to_string()),
        country: merged.country,
        region: merged.region,
        city: merged.city,
        postal: merged.postal,
        latitude: merged.latitude,
        longitude: merged.longitude,
        isp: merged.isp,
        org: merged.org,
        asn: merged.asn,
        is_proxy: merged.is_proxy.unwrap_or(false),
        is_hosting: merged.is_hosting.unwrap_or(false),
        map_link: None,
    };
    record.map_link = map_link(&record);
    record
}

fn fill<T: Clone>(slot: &mut Option<T>, candidate: &Option<T>) {
    if slot.is_none() {
        *slot = candidate.clone();
    }
}

fn same_place(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// A map link for the record: coordinates when both are known, otherwise a
/// place search when at least the city is known.
pub fn map_link(record: &GeoRecord) -> Option<String> {
    if let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) {
        let mut url = Url::parse(MAPS_COORDINATES_BASE).ok()?;
        url.set_query(Some(&format!("q={latitude},{longitude}")));
        return Some(url.into());
    }

    let city = record.city.as_deref()?;
    let place = [Some(city), record.region.as_deref(), record.country.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(",");

    let mut url = Url::parse(MAPS_SEARCH_BASE).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(&place);
    Some(url.into())
}
