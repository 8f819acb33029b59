//! Metrics definitions for the geo resolver.

use shared::metrics_defs::{MetricDef, MetricType};

pub const PROVIDER_LOOKUP: MetricDef = MetricDef {
    name: "geo.provider.lookup",
    metric_type: MetricType::Counter,
    description: "Number of provider lookups. Tagged with provider, status.",
};

pub const PUBLIC_IP_LOOKUP: MetricDef = MetricDef {
    name: "geo.public_ip.lookup",
    metric_type: MetricType::Counter,
    description: "Number of public address lookups for private visitors. Tagged with status.",
};

pub const RESOLVE_DURATION: MetricDef = MetricDef {
    name: "geo.resolve.duration",
    metric_type: MetricType::Histogram,
    description: "Time to resolve and merge a location in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[PROVIDER_LOOKUP, PUBLIC_IP_LOOKUP, RESOLVE_DURATION];
