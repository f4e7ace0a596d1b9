//! Network statistics collectors for Linux.
//!
//! Each collector reads one or two files under `/proc/net`, parses them into
//! a [`StatTable`] and exposes every (protocol, stat) pair as a Prometheus
//! gauge. Gauge handles are cached per collector instance so metric identity
//! is stable across collection cycles.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Collector (trait)                    │
//! │  ┌──────────────────────┐   ┌──────────────────────────┐ │
//! │  │   NetStatCollector   │   │    SockStatCollector     │ │
//! │  │  - /proc/net/netstat │   │  - /proc/net/sockstat    │ │
//! │  │  - /proc/net/snmp    │   │  - derived mem_bytes     │ │
//! │  └──────────┬───────────┘   └────────────┬─────────────┘ │
//! │             └──────────────┬─────────────┘               │
//! │                     ┌──────▼──────┐                      │
//! │                     │  FileSystem │ (trait)              │
//! │                     └──────┬──────┘                      │
//! └────────────────────────────┼─────────────────────────────┘
//!                  ┌───────────┴───────────┐
//!           ┌──────▼──────┐         ┌──────▼──────┐
//!           │   RealFs    │         │   MockFs    │
//!           │  (Linux)    │         │  (Testing)  │
//!           └─────────────┘         └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use procnet::collector::{Collector, NetStatCollector, mock::MockFs};
//!
//! let fs = MockFs::typical_system();
//! let mut collector = NetStatCollector::new(fs, "/proc");
//!
//! let mut families = Vec::new();
//! collector.update(&mut families).unwrap();
//! assert!(!families.is_empty());
//! ```

pub mod mock;
mod netstat;
mod sockstat;
pub mod traits;

use std::collections::HashMap;

use prometheus::proto::MetricFamily;

pub use netstat::{NetStatCollector, parse_net_stats};
pub use sockstat::{SockStatCollector, parse_sock_stats};
pub use traits::{FileSystem, RealFs};

/// Namespace prefix for all exported metrics.
pub const NAMESPACE: &str = "node";

/// Parsed statistics: protocol name -> stat name -> raw textual value.
///
/// Values stay strings until emission; numeric conversion is a separate,
/// fallible step so parsing itself is pure.
pub type StatTable = HashMap<String, HashMap<String, String>>;

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading a proc file.
    Io { file: String, source: std::io::Error },
    /// Header/value field count mismatch in a two-line record.
    FormatMismatch { file: String, protocol: String },
    /// A statistic value that does not parse as a number.
    ValueParse { key: String, value: String },
    /// Missing or non-numeric `mem` field needed for byte derivation.
    DerivedMetric {
        file: String,
        protocol: String,
        value: String,
    },
    /// Gauge construction failure.
    Metric(prometheus::Error),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io { file, source } => write!(f, "couldn't read {}: {}", file, source),
            CollectError::FormatMismatch { file, protocol } => {
                write!(f, "field count mismatch in {}: {}", file, protocol)
            }
            CollectError::ValueParse { key, value } => {
                write!(f, "invalid value '{}' for {}", value, key)
            }
            CollectError::DerivedMetric {
                file,
                protocol,
                value,
            } => {
                if value.is_empty() {
                    write!(f, "missing mem value for {} in {}", protocol, file)
                } else {
                    write!(f, "invalid mem value '{}' for {} in {}", value, protocol, file)
                }
            }
            CollectError::Metric(e) => write!(f, "metric registration failed: {}", e),
        }
    }
}

impl std::error::Error for CollectError {}

impl From<prometheus::Error> for CollectError {
    fn from(e: prometheus::Error) -> Self {
        CollectError::Metric(e)
    }
}

/// A source of metrics, updated once per collection cycle.
///
/// Implementations own their gauge cache; `update` must not be called
/// concurrently on one instance, but distinct instances are independent.
pub trait Collector {
    /// Collector name used in logs.
    fn name(&self) -> &'static str;

    /// Runs one collection cycle, appending every cached metric to `mfs`.
    ///
    /// On error nothing is appended for this cycle; the cache keeps the
    /// values from the last successful cycle.
    fn update(&mut self, mfs: &mut Vec<MetricFamily>) -> Result<(), CollectError>;
}
