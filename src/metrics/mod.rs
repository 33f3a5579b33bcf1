//! Metrics and observability module
//!
//! Key metrics exposed:
//! - Baseline chunks and bytes hashed
//! - Delta operations by kind and literal bytes
//! - Signature and delta durations

pub mod recorder;

pub use recorder::{init_metrics, record_delta, record_signature, SignatureTimer};
