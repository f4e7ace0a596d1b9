//! procnet — network-protocol statistics exporter for Linux.
//!
//! Reads kernel counters from `/proc/net/{netstat,snmp,sockstat}` and exposes
//! them as Prometheus gauges.
//!
//! Provides:
//! - `collector` — netstat and sockstat collectors with a mockable
//!   filesystem seam
//! - `util` — kernel page size lookup

pub mod collector;
pub mod util;
