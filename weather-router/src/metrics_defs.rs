use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with status.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const UPSTREAM_REQUESTS: MetricDef = MetricDef {
    name: "upstream.requests",
    metric_type: MetricType::Counter,
    description: "Upstream fetches. Tagged with endpoint and outcome (json, non_json, error).",
};

pub const ORIGIN_REJECTED: MetricDef = MetricDef {
    name: "origin.rejected",
    metric_type: MetricType::Counter,
    description: "Requests rejected by the origin whitelist",
};

pub const COLLATE_ERRORS: MetricDef = MetricDef {
    name: "collate.errors",
    metric_type: MetricType::Counter,
    description: "Normalized upstream results that failed to parse. Tagged with endpoint.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    UPSTREAM_REQUESTS,
    ORIGIN_REJECTED,
    COLLATE_ERRORS,
];
