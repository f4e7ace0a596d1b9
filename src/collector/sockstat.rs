//! Collector for `/proc/net/sockstat`.
//!
//! Each line is a complete protocol record of alternating stat names and
//! values. On top of the raw counters the collector derives `mem_bytes` for
//! TCP and UDP by multiplying the kernel's page-count `mem` field with the
//! memory page size.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use prometheus::core::Collector as _;
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};

use crate::collector::traits::FileSystem;
use crate::collector::{CollectError, Collector, NAMESPACE, StatTable};
use crate::util;

const PROC_NET_SOCKSTAT: &str = "net/sockstat";
const SOCKSTAT_SUBSYSTEM: &str = "sockstat";

/// Parses single-line record content (`/proc/net/sockstat`).
///
/// Records look like:
///
/// ```text
/// TCP: inuse 4 orphan 0 tw 4 alloc 17 mem 3
/// ```
///
/// Fields after the protocol token are walked two at a time; an odd trailing
/// field with no value is silently dropped, matching the kernel format's
/// guarantee that pairs are always complete.
///
/// After parsing, `mem_bytes` is inserted for the `TCP` and `UDP` entries as
/// `mem × page_size`. A missing or non-numeric `mem` field fails the whole
/// parse with [`CollectError::DerivedMetric`].
pub fn parse_sock_stats(
    content: &str,
    file_name: &str,
    page_size: u64,
) -> Result<StatTable, CollectError> {
    let mut stats = StatTable::new();

    for line in content.lines() {
        let fields: Vec<&str> = line.split(' ').collect();
        let protocol = fields[0].trim_end_matches(':').to_string();

        let mut protocol_stats = HashMap::new();
        for pair in fields[1..].chunks_exact(2) {
            protocol_stats.insert(pair[0].to_string(), pair[1].to_string());
        }
        stats.insert(protocol, protocol_stats);
    }

    // The mem stat counts pages; expose the byte count as well.
    derive_mem_bytes(&mut stats, "TCP", file_name, page_size)?;
    derive_mem_bytes(&mut stats, "UDP", file_name, page_size)?;

    Ok(stats)
}

fn derive_mem_bytes(
    stats: &mut StatTable,
    protocol: &str,
    file_name: &str,
    page_size: u64,
) -> Result<(), CollectError> {
    let error = |value: String| CollectError::DerivedMetric {
        file: file_name.to_string(),
        protocol: protocol.to_string(),
        value,
    };

    let protocol_stats = stats.get_mut(protocol).ok_or_else(|| error(String::new()))?;
    let raw = protocol_stats
        .get("mem")
        .ok_or_else(|| error(String::new()))?;
    let page_count: u64 = raw.parse().map_err(|_| error(raw.clone()))?;
    protocol_stats.insert("mem_bytes".to_string(), (page_count * page_size).to_string());
    Ok(())
}

/// Collector exposing socket occupancy statistics from `/proc/net/sockstat`.
pub struct SockStatCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
    page_size: u64,
    metrics: HashMap<String, Gauge>,
}

impl<F: FileSystem> SockStatCollector<F> {
    /// Creates a new sockstat collector.
    ///
    /// The kernel page size is queried once here and reused for every cycle.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            page_size: util::page_size(),
            metrics: HashMap::new(),
        }
    }

    /// Overrides the detected page size. Useful for tests.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }
}

impl<F: FileSystem> Collector for SockStatCollector<F> {
    fn name(&self) -> &'static str {
        "sockstat"
    }

    fn update(&mut self, mfs: &mut Vec<MetricFamily>) -> Result<(), CollectError> {
        let path = Path::new(&self.proc_path).join(PROC_NET_SOCKSTAT);
        let file = path.display().to_string();
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|source| CollectError::Io {
                file: file.clone(),
                source,
            })?;
        let sock_stats = parse_sock_stats(&content, &file, self.page_size)?;

        for (protocol, protocol_stats) in &sock_stats {
            for (name, value) in protocol_stats {
                let key = format!("{}_{}", protocol, name);
                let gauge = match self.metrics.entry(key.clone()) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        let opts = Opts::new(
                            key.as_str(),
                            format!("Number of {} sockets in state {}.", protocol, name),
                        )
                        .namespace(NAMESPACE)
                        .subsystem(SOCKSTAT_SUBSYSTEM);
                        e.insert(Gauge::with_opts(opts)?)
                    }
                };
                let v: f64 = value.parse().map_err(|_| CollectError::ValueParse {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                gauge.set(v);
            }
        }

        for gauge in self.metrics.values() {
            mfs.extend(gauge.collect());
        }
        Ok(())
    }
}
