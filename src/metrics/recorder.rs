//! Metrics recorder for delta operations
//!
//! Records counters and timings through the `metrics` facade. Nothing is
//! exported unless the embedding application installs a recorder.

use crate::sync::delta::DeltaStats;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    describe_counter!(
        "chunkdiff_signature_chunks_total",
        "Total number of baseline chunks hashed"
    );
    describe_counter!(
        "chunkdiff_signature_bytes_total",
        "Total baseline bytes hashed"
    );
    describe_counter!(
        "chunkdiff_delta_ops_total",
        "Delta operations emitted, labelled by kind"
    );
    describe_counter!(
        "chunkdiff_literal_bytes_total",
        "Literal bytes carried by modified and inserted operations"
    );
    describe_counter!(
        "chunkdiff_scanned_bytes_total",
        "Total bytes of new streams scanned"
    );

    describe_histogram!(
        "chunkdiff_signature_duration_seconds",
        "Time to build a signature table"
    );
    describe_histogram!(
        "chunkdiff_delta_duration_seconds",
        "Time to compute a delta"
    );
}

/// Record a finished signature table build
pub fn record_signature(chunks: usize, bytes: u64, duration: Duration) {
    counter!("chunkdiff_signature_chunks_total").increment(chunks as u64);
    counter!("chunkdiff_signature_bytes_total").increment(bytes);
    histogram!("chunkdiff_signature_duration_seconds").record(duration.as_secs_f64());
}

/// Record a finished delta computation
pub fn record_delta(stats: &DeltaStats, duration: Duration) {
    for (kind, count) in [
        ("unmodified", stats.unmodified),
        ("modified", stats.modified),
        ("inserted", stats.inserted),
        ("removed", stats.removed),
    ] {
        counter!("chunkdiff_delta_ops_total", "kind" => kind).increment(count as u64);
    }

    counter!("chunkdiff_literal_bytes_total").increment(stats.literal_bytes);
    counter!("chunkdiff_scanned_bytes_total").increment(stats.target_size);
    histogram!("chunkdiff_delta_duration_seconds").record(duration.as_secs_f64());
}

/// Times a signature build and records it on completion
pub struct SignatureTimer {
    start_time: Instant,
}

impl SignatureTimer {
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Stop timing and record the build
    pub fn finish(self, chunks: usize, bytes: u64) {
        record_signature(chunks, bytes, self.start_time.elapsed());
    }
}
