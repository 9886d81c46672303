use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, TextEncoder};

static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "thumbnail_cache_lookups_total",
            "Thumbnail storage lookups by result",
        ),
        &["result"],
    )
    .expect("failed to create thumbnail_cache_lookups_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register thumbnail_cache_lookups_total");
    counter
});

static GENERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "thumbnail_generations_total",
            "Thumbnail generations by result",
        ),
        &["result"],
    )
    .expect("failed to create thumbnail_generations_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register thumbnail_generations_total");
    counter
});

static COALESCED_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "thumbnail_coalesced_requests_total",
        "Requests that joined an in-flight generation",
    )
    .expect("failed to create thumbnail_coalesced_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register thumbnail_coalesced_requests_total");
    counter
});

static STORE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "thumbnail_store_failures_total",
        "Generated thumbnails that could not be written to storage",
    )
    .expect("failed to create thumbnail_store_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register thumbnail_store_failures_total");
    counter
});

static GENERATION_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            "thumbnail_generation_duration_seconds",
            "Fetch, resize and encode latency",
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .expect("failed to create thumbnail_generation_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register thumbnail_generation_duration_seconds");
    histogram
});

pub fn record_cache_hit() {
    CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();
}

pub fn record_cache_error() {
    CACHE_LOOKUPS_TOTAL.with_label_values(&["error"]).inc();
}

pub fn record_coalesced() {
    COALESCED_REQUESTS_TOTAL.inc();
}

pub fn record_store_failure() {
    STORE_FAILURES_TOTAL.inc();
}

pub fn record_generation(success: bool, seconds: f64) {
    let result = if success { "success" } else { "failure" };
    GENERATIONS_TOTAL.with_label_values(&[result]).inc();
    GENERATION_DURATION_SECONDS.observe(seconds);
}

pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
