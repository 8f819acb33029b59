//! Metrics definitions for the notification relay.

use shared::metrics_defs::{MetricDef, MetricType};

pub const TASKS_ENQUEUED: MetricDef = MetricDef {
    name: "relay.tasks.enqueued",
    metric_type: MetricType::Counter,
    description: "Number of tasks handed to the relay. Tagged with kind.",
};

pub const TASKS_PROCESSED: MetricDef = MetricDef {
    name: "relay.tasks.processed",
    metric_type: MetricType::Counter,
    description: "Number of tasks taken off the queue. Tagged with kind, outcome.",
};

pub const QUEUE_DEPTH: MetricDef = MetricDef {
    name: "relay.queue.depth",
    metric_type: MetricType::Gauge,
    description: "Number of tasks waiting behind the one being delivered",
};

pub const ALL_METRICS: &[MetricDef] = &[TASKS_ENQUEUED, TASKS_PROCESSED, QUEUE_DEPTH];
