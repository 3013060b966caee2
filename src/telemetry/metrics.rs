//! Metric instrument factories for asyncq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op, so recording
//! is always safe.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for asyncq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("asyncq")
}

/// Counter: work items put by producers.
/// Labels: `producer`.
pub fn items_produced() -> Counter<u64> {
    meter()
        .u64_counter("asyncq.items.produced")
        .with_description("Number of work items put on the queue by producers")
        .build()
}

/// Counter: work items processed by consumers.
/// Labels: `consumer`.
pub fn items_consumed() -> Counter<u64> {
    meter()
        .u64_counter("asyncq.items.consumed")
        .with_description("Number of work items processed by consumers")
        .build()
}

/// Counter: queue acknowledgments (task_done calls), sentinels included.
/// Labels: `kind` ("item" | "sentinel").
pub fn acknowledged() -> Counter<u64> {
    meter()
        .u64_counter("asyncq.queue.acknowledged")
        .with_description("Number of queue acknowledgments")
        .build()
}

/// Counter: shutdown sentinels sent by the simulator.
pub fn sentinels_sent() -> Counter<u64> {
    meter()
        .u64_counter("asyncq.sentinels.sent")
        .with_description("Number of shutdown sentinels put on the queue")
        .build()
}

/// Histogram: per-item processing duration in milliseconds.
/// Labels: `consumer`.
pub fn processing_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("asyncq.processing.duration_ms")
        .with_description("Per-item processing duration in milliseconds")
        .with_unit("ms")
        .build()
}
