use serde::{Deserialize, Serialize};

/// Placeholder shown wherever a location field could not be resolved.
pub const UNKNOWN: &str = "unknown";

// Placeholders some providers send instead of leaving a field out.
const PLACEHOLDERS: &[&str] = &["unknown", "不明", "-", "n/a"];

/// Normalizes a provider supplied string. Empty values and placeholders
/// count as absent.
pub fn known(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty()
        || PLACEHOLDERS
            .iter()
            .any(|placeholder| value.eq_ignore_ascii_case(placeholder))
    {
        return None;
    }
    Some(value.to_string())
}

/// Drops NaN and infinite coordinates.
pub fn known_coordinate(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Splits an `"AS2516 KDDI CORPORATION"` style string into the AS number and
/// the holder name.
pub fn split_asn(value: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(value) = known(value) else {
        return (None, None);
    };

    match value.split_once(' ') {
        Some((asn, name)) if is_asn(asn) => (Some(asn.to_string()), known(Some(name))),
        None if is_asn(&value) => (Some(value), None),
        _ => (None, Some(value)),
    }
}

fn is_asn(token: &str) -> bool {
    let digits = token
        .strip_prefix("AS")
        .or_else(|| token.strip_prefix("as"));
    matches!(digits, Some(d) if !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
}

/// What a single provider knows about an address. Every field is optional;
/// absent means the provider did not supply a usable value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartialGeo {
    pub ip: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub postal: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub isp: Option<String>,
    pub org: Option<String>,
    pub asn: Option<String>,
    pub is_proxy: Option<bool>,
    pub is_hosting: Option<bool>,
}

impl PartialGeo {
    /// Re-applies normalization to every field.
    pub fn normalized(&self) -> PartialGeo {
        PartialGeo {
            ip: known(self.ip.as_deref()),
            country: known(self.country.as_deref()),
            region: known(self.region.as_deref()),
            city: known(self.city.as_deref()),
            postal: known(self.postal.as_deref()),
            latitude: known_coordinate(self.latitude),
            longitude: known_coordinate(self.longitude),
            isp: known(self.isp.as_deref()),
            org: known(self.org.as_deref()),
            asn: known(self.asn.as_deref()),
            is_proxy: self.is_proxy,
            is_hosting: self.is_hosting,
        }
    }
}

/// The merged location of one visitor address.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoRecord {
    pub ip: String,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub postal: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub isp: Option<String>,
    pub org: Option<String>,
    pub asn: Option<String>,
    pub is_proxy: bool,
    pub is_hosting: bool,
    pub map_link: Option<String>,
}

impl GeoRecord {
    /// A record where nothing but the address is known.
    pub fn unknown(ip: impl Into<String>) -> Self {
        GeoRecord {
            ip: ip.into(),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn is_unknown(&self) -> bool {
        *self == GeoRecord::unknown(self.ip.clone())
    }
}

/// Renders an optional field, substituting [`UNKNOWN`].
pub fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}
