//! Metrics definitions for the gateway.

use shared::metrics_defs::{MetricDef, MetricType};

pub const VERIFICATIONS: MetricDef = MetricDef {
    name: "gateway.verifications",
    metric_type: MetricType::Counter,
    description: "Number of OAuth callbacks handled. Tagged with outcome.",
};

pub const RECORDER_FAILURES: MetricDef = MetricDef {
    name: "gateway.recorder.failures",
    metric_type: MetricType::Counter,
    description: "Number of access log appends that could not be persisted",
};

pub const ALL_METRICS: &[MetricDef] = &[VERIFICATIONS, RECORDER_FAILURES];
