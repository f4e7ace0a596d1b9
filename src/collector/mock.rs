//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! `MockFs` stores file contents in memory behind a shared lock; clones see
//! the same files, so a test can keep a handle and swap contents between
//! collection cycles of a live collector.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::collector::traits::FileSystem;

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: Arc<RwLock<HashMap<PathBuf, String>>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content, replacing any existing one.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .write()
            .expect("mock filesystem lock poisoned")
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Removes a file, simulating a missing proc entry.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.files
            .write()
            .expect("mock filesystem lock poisoned")
            .remove(path.as_ref());
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .read()
            .expect("mock filesystem lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("file not found: {:?}", path),
                )
            })
    }
}

impl MockFs {
    /// Creates a typical system with realistic network statistics.
    ///
    /// Includes `/proc/net/netstat`, `/proc/net/snmp` and
    /// `/proc/net/sockstat` as an idle desktop kernel would report them.
    pub fn typical_system() -> Self {
        let fs = Self::new();

        fs.add_file(
            "/proc/net/netstat",
            "\
TcpExt: SyncookiesSent SyncookiesRecv SyncookiesFailed EmbryonicRsts PruneCalled ListenOverflows ListenDrops TCPTimeouts TCPFastRetrans
TcpExt: 0 0 0 0 0 0 0 115 38
IpExt: InNoRoutes InTruncatedPkts InMcastPkts OutMcastPkts InOctets OutOctets
IpExt: 0 0 20 30 123456789 987654321
",
        );

        fs.add_file(
            "/proc/net/snmp",
            "\
Ip: Forwarding DefaultTTL InReceives InHdrErrors InAddrErrors ForwDatagrams InUnknownProtos InDiscards InDelivers OutRequests OutDiscards OutNoRoutes
Ip: 1 64 25346544 0 0 0 0 0 25336676 21260028 0 0
Icmp: InMsgs InErrors InDestUnreachs InEchos InEchoReps OutMsgs OutErrors OutDestUnreachs
Icmp: 104 0 104 12 8 120 0 120
Tcp: RtoAlgorithm RtoMin RtoMax MaxConn ActiveOpens PassiveOpens AttemptFails EstabResets CurrEstab InSegs OutSegs RetransSegs InErrs OutRsts
Tcp: 1 200 120000 -1 597 382 17 128 43 24197500 20115265 271 0 320
Udp: InDatagrams NoPorts InErrors OutDatagrams
Udp: 88542 120 0 53028
",
        );

        fs.add_file(
            "/proc/net/sockstat",
            "\
sockets: used 229
TCP: inuse 4 orphan 0 tw 4 alloc 17 mem 3
UDP: inuse 0 mem 2
UDPLITE: inuse 0
RAW: inuse 0
FRAG: inuse 0 memory 0
",
        );

        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let fs = MockFs::new();
        fs.add_file("/proc/net/sockstat", "TCP: inuse 4 mem 3\n");

        let content = fs.read_to_string(Path::new("/proc/net/sockstat")).unwrap();
        assert_eq!(content, "TCP: inuse 4 mem 3\n");
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_fs_clones_share_files() {
        let fs = MockFs::new();
        let clone = fs.clone();
        fs.add_file("/proc/net/snmp", "Udp: InErrors\nUdp: 7\n");

        let content = clone.read_to_string(Path::new("/proc/net/snmp")).unwrap();
        assert!(content.starts_with("Udp:"));

        clone.remove_file("/proc/net/snmp");
        assert!(fs.read_to_string(Path::new("/proc/net/snmp")).is_err());
    }

    #[test]
    fn test_typical_system_has_net_files() {
        let fs = MockFs::typical_system();
        for file in [
            "/proc/net/netstat",
            "/proc/net/snmp",
            "/proc/net/sockstat",
        ] {
            assert!(fs.read_to_string(Path::new(file)).is_ok(), "{}", file);
        }
    }
}
