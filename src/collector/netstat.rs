//! Collector for `/proc/net/netstat` and `/proc/net/snmp`.
//!
//! Both files share the two-line record format: a header line naming the
//! statistics of one protocol followed by a value line with the same field
//! count. The two files are parsed separately and merged, with `net/snmp`
//! taking precedence on protocol collisions.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use prometheus::core::Collector as _;
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};

use crate::collector::traits::FileSystem;
use crate::collector::{CollectError, Collector, NAMESPACE, StatTable};

const PROC_NET_NETSTAT: &str = "net/netstat";
const PROC_NET_SNMP: &str = "net/snmp";
const NETSTAT_SUBSYSTEM: &str = "netstat";

/// Parses two-line record content (`/proc/net/netstat`, `/proc/net/snmp`).
///
/// Records come as line pairs:
///
/// ```text
/// Tcp: ActiveOpens PassiveOpens InSegs
/// Tcp: 597 382 24197500
/// ```
///
/// `file_name` only labels error messages. Fails with
/// [`CollectError::FormatMismatch`] when header and value field counts
/// differ, including when a trailing header line has no value line at all.
/// On error no partial table is returned.
///
/// A protocol appearing twice in one stream replaces its earlier entry.
pub fn parse_net_stats(content: &str, file_name: &str) -> Result<StatTable, CollectError> {
    let mut stats = StatTable::new();
    let mut lines = content.lines();

    while let Some(header_line) = lines.next() {
        // A missing value line yields a single empty field, which the count
        // check below rejects.
        let value_line = lines.next().unwrap_or("");
        let header_fields: Vec<&str> = header_line.split(' ').collect();
        let value_fields: Vec<&str> = value_line.split(' ').collect();

        let protocol = header_fields[0].trim_end_matches(':').to_string();
        if header_fields.len() != value_fields.len() {
            return Err(CollectError::FormatMismatch {
                file: file_name.to_string(),
                protocol,
            });
        }

        let mut protocol_stats = HashMap::new();
        for (name, value) in header_fields[1..].iter().zip(&value_fields[1..]) {
            protocol_stats.insert(name.to_string(), value.to_string());
        }
        stats.insert(protocol, protocol_stats);
    }

    Ok(stats)
}

/// Collector exposing network protocol statistics from
/// `/proc/net/netstat` and `/proc/net/snmp`.
pub struct NetStatCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
    metrics: HashMap<String, Gauge>,
}

impl<F: FileSystem> NetStatCollector<F> {
    /// Creates a new netstat collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            metrics: HashMap::new(),
        }
    }

    fn read_stats(&self, rel_path: &str) -> Result<StatTable, CollectError> {
        let path = Path::new(&self.proc_path).join(rel_path);
        let file = path.display().to_string();
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|source| CollectError::Io {
                file: file.clone(),
                source,
            })?;
        parse_net_stats(&content, &file)
    }
}

impl<F: FileSystem> Collector for NetStatCollector<F> {
    fn name(&self) -> &'static str {
        "netstat"
    }

    fn update(&mut self, mfs: &mut Vec<MetricFamily>) -> Result<(), CollectError> {
        let mut net_stats = self.read_stats(PROC_NET_NETSTAT)?;
        let snmp_stats = self.read_stats(PROC_NET_SNMP)?;

        // Merge snmp over netstat; whole protocol entries are replaced on
        // collision, never field-merged.
        for (protocol, protocol_stats) in snmp_stats {
            net_stats.insert(protocol, protocol_stats);
        }

        for (protocol, protocol_stats) in &net_stats {
            for (name, value) in protocol_stats {
                let key = format!("{}_{}", protocol, name);
                let gauge = match self.metrics.entry(key.clone()) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        let opts = Opts::new(
                            key.as_str(),
                            format!("{} {} from /proc/net/{{netstat,snmp}}.", protocol, name),
                        )
                        .namespace(NAMESPACE)
                        .subsystem(NETSTAT_SUBSYSTEM);
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

        // Emit the whole cache, including gauges absent from this snapshot.
        for gauge in self.metrics.values() {
            mfs.extend(gauge.collect());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    fn family_names(mfs: &[MetricFamily]) -> Vec<String> {
        let mut names: Vec<String> = mfs.iter().map(|mf| mf.get_name().to_string()).collect();
        names.sort();
        names
    }

    fn gauge_value(mfs: &[MetricFamily], name: &str) -> Option<f64> {
        mfs.iter()
            .find(|mf| mf.get_name() == name)
            .map(|mf| mf.get_metric()[0].get_gauge().get_value())
    }

    #[test]
    fn test_parse_net_stats() {
        let content = "\
Tcp: ActiveOpens PassiveOpens CurrEstab InSegs OutSegs RetransSegs
Tcp: 597 382 43 24197500 20115265 271
Udp: InDatagrams NoPorts InErrors OutDatagrams
Udp: 88542 120 0 53028
";
        let stats = parse_net_stats(content, "net/snmp").unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats["Tcp"]["ActiveOpens"], "597");
        assert_eq!(stats["Tcp"]["InSegs"], "24197500");
        assert_eq!(stats["Udp"]["NoPorts"], "120");
        assert_eq!(stats["Udp"].len(), 4);
    }

    #[test]
    fn test_parse_net_stats_deterministic() {
        let content = "\
TcpExt: ListenOverflows ListenDrops TCPTimeouts
TcpExt: 0 0 115
";
        let first = parse_net_stats(content, "net/netstat").unwrap();
        let second = parse_net_stats(content, "net/netstat").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_net_stats_field_count_mismatch() {
        let content = "\
Tcp: A B C
Tcp: 1 2
";
        let err = parse_net_stats(content, "net/snmp").unwrap_err();
        match err {
            CollectError::FormatMismatch { file, protocol } => {
                assert_eq!(file, "net/snmp");
                assert_eq!(protocol, "Tcp");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_net_stats_trailing_header_fails() {
        // Header line with no matching value line must fail, not be dropped.
        let content = "\
Udp: InDatagrams NoPorts
Udp: 88542 120
Tcp: ActiveOpens PassiveOpens
";
        let err = parse_net_stats(content, "net/snmp").unwrap_err();
        assert!(matches!(err, CollectError::FormatMismatch { .. }));
    }

    #[test]
    fn test_parse_net_stats_duplicate_protocol_last_wins() {
        let content = "\
Tcp: ActiveOpens
Tcp: 1
Tcp: PassiveOpens
Tcp: 2
";
        let stats = parse_net_stats(content, "net/snmp").unwrap();
        // The second record fully replaces the first.
        assert_eq!(stats["Tcp"].len(), 1);
        assert_eq!(stats["Tcp"]["PassiveOpens"], "2");
        assert!(!stats["Tcp"].contains_key("ActiveOpens"));
    }

    #[test]
    fn test_parse_net_stats_round_trip() {
        let content = "\
Ip: Forwarding DefaultTTL InReceives
Ip: 1 64 25346544
Tcp: ActiveOpens CurrEstab
Tcp: 597 43
";
        let stats = parse_net_stats(content, "net/snmp").unwrap();

        // Serialize back to the two-line format and re-parse.
        let mut rebuilt = String::new();
        for (protocol, protocol_stats) in &stats {
            let mut names = Vec::new();
            let mut values = Vec::new();
            for (name, value) in protocol_stats {
                names.push(name.as_str());
                values.push(value.as_str());
            }
            rebuilt.push_str(&format!("{}: {}\n", protocol, names.join(" ")));
            rebuilt.push_str(&format!("{}: {}\n", protocol, values.join(" ")));
        }

        let reparsed = parse_net_stats(&rebuilt, "rebuilt").unwrap();
        assert_eq!(stats, reparsed);
    }

    #[test]
    fn test_update_emits_merged_stats() {
        let fs = MockFs::typical_system();
        let mut collector = NetStatCollector::new(fs, "/proc");

        let mut mfs = Vec::new();
        collector.update(&mut mfs).unwrap();

        assert_eq!(
            gauge_value(&mfs, "node_netstat_Tcp_ActiveOpens"),
            Some(597.0)
        );
        assert_eq!(gauge_value(&mfs, "node_netstat_TcpExt_TCPTimeouts"), Some(115.0));
        assert_eq!(gauge_value(&mfs, "node_netstat_Udp_InErrors"), Some(0.0));
    }

    #[test]
    fn test_update_merge_is_right_biased() {
        let fs = MockFs::new();
        fs.add_file(
            "/proc/net/netstat",
            "Tcp: NetstatOnly Shared\nTcp: 11 22\n",
        );
        fs.add_file("/proc/net/snmp", "Tcp: Shared SnmpOnly\nTcp: 33 44\n");
        let mut collector = NetStatCollector::new(fs, "/proc");

        let mut mfs = Vec::new();
        collector.update(&mut mfs).unwrap();

        // snmp's whole Tcp entry replaces netstat's; NetstatOnly is gone.
        assert_eq!(gauge_value(&mfs, "node_netstat_Tcp_Shared"), Some(33.0));
        assert_eq!(gauge_value(&mfs, "node_netstat_Tcp_SnmpOnly"), Some(44.0));
        assert_eq!(gauge_value(&mfs, "node_netstat_Tcp_NetstatOnly"), None);
    }

    #[test]
    fn test_update_idempotent() {
        let fs = MockFs::typical_system();
        let mut collector = NetStatCollector::new(fs, "/proc");

        let mut first = Vec::new();
        collector.update(&mut first).unwrap();
        let mut second = Vec::new();
        collector.update(&mut second).unwrap();

        assert_eq!(family_names(&first), family_names(&second));
        for mf in &first {
            let name = mf.get_name();
            assert_eq!(
                gauge_value(&first, name),
                gauge_value(&second, name),
                "value changed for {}",
                name
            );
        }
    }

    #[test]
    fn test_update_keeps_metrics_for_vanished_protocol() {
        let fs = MockFs::new();
        fs.add_file("/proc/net/netstat", "TcpExt: TCPTimeouts\nTcpExt: 115\n");
        fs.add_file("/proc/net/snmp", "Udp: InErrors\nUdp: 7\n");
        let mut collector = NetStatCollector::new(fs.clone(), "/proc");

        let mut first = Vec::new();
        collector.update(&mut first).unwrap();
        assert_eq!(gauge_value(&first, "node_netstat_Udp_InErrors"), Some(7.0));

        // The Udp protocol disappears from the next kernel snapshot.
        fs.add_file("/proc/net/snmp", "Icmp: InMsgs\nIcmp: 3\n");
        let mut second = Vec::new();
        collector.update(&mut second).unwrap();

        // Still emitted at its last observed value; the cache never shrinks.
        assert_eq!(gauge_value(&second, "node_netstat_Udp_InErrors"), Some(7.0));
        assert_eq!(gauge_value(&second, "node_netstat_Icmp_InMsgs"), Some(3.0));
    }

    #[test]
    fn test_update_value_parse_error_emits_nothing() {
        let fs = MockFs::new();
        fs.add_file("/proc/net/netstat", "TcpExt: TCPTimeouts\nTcpExt: oops\n");
        fs.add_file("/proc/net/snmp", "Udp: InErrors\nUdp: 7\n");
        let mut collector = NetStatCollector::new(fs, "/proc");

        let mut mfs = Vec::new();
        let err = collector.update(&mut mfs).unwrap_err();
        match err {
            CollectError::ValueParse { key, value } => {
                assert_eq!(key, "TcpExt_TCPTimeouts");
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(mfs.is_empty());
    }

    #[test]
    fn test_update_missing_file_is_io_error() {
        let fs = MockFs::new();
        let mut collector = NetStatCollector::new(fs, "/proc");

        let mut mfs = Vec::new();
        let err = collector.update(&mut mfs).unwrap_err();
        match err {
            CollectError::Io { file, .. } => assert_eq!(file, "/proc/net/netstat"),
            other => panic!("unexpected error: {}", other),
        }
        assert!(mfs.is_empty());
    }
}
