//! Metrics sinks and reporting
//!
//! - Plaintext forwarding of measured events to an external collector
//! - In-process aggregation of events for the final report
//! - Report formatting

pub mod forwarder;
pub mod reporting;
pub mod stats;

// Re-export public types for easier access
pub use forwarder::MetricsForwarder;
pub use stats::StatsSink;
