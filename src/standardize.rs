//! Column standardization.
//!
//! Vendor counter identifiers (e.g. `ifInOctets11`) are renamed to readable
//! metric names (`RxBytes`) and each metric carries a unit tag. The rename is
//! purely cosmetic: values are never converted.

use serde::{Deserialize, Serialize};

use crate::table::DataTable;

/// One raw-name -> standard-name mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnMapping {
    pub raw: String,
    pub standard: String,
    pub unit: String,
}

impl ColumnMapping {
    pub fn new(raw: &str, standard: &str, unit: &str) -> Self {
        Self {
            raw: raw.to_string(),
            standard: standard.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// Ordered standardization map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnMap {
    pub entries: Vec<ColumnMapping>,
}

impl ColumnMap {
    pub fn new(entries: Vec<ColumnMapping>) -> Self {
        Self { entries }
    }

    /// The SNMP MIB-II interface/TCP/UDP/IP/ICMP counters.
    pub fn snmp() -> Self {
        const ENTRIES: [(&str, &str, &str); 34] = [
            ("ifInOctets11", "RxBytes", "bps"),
            ("ifOutOctets11", "TxBytes", "bps"),
            ("ifoutDiscards11", "TxDiscards", "pkts"),
            ("ifInUcastPkts11", "RxUnicastPkts", "pkts"),
            ("ifInNUcastPkts11", "RxNonUnicastPkts", "pkts"),
            ("ifInDiscards11", "RxDiscards", "pkts"),
            ("ifOutUcastPkts11", "TxUnicastPkts", "pkts"),
            ("ifOutNUcastPkts11", "TxNonUnicastPkts", "pkts"),
            ("tcpOutRsts", "TcpTxResets", "pkts"),
            ("tcpInSegs", "TcpRxSegments", "pkts"),
            ("tcpOutSegs", "TcpTxSegments", "pkts"),
            ("tcpPassiveOpens", "TcpPassiveOpens", "conn"),
            ("tcpRetransSegs", "TcpRetransmissions", "pkts"),
            ("tcpCurrEstab", "TcpCurrentConnections", "conn"),
            ("tcpEstabResets", "TcpEstabResets", "conn"),
            ("tcpActiveOpens", "TcpActiveOpens", "conn"),
            ("udpInDatagrams", "UdpRxDatagrams", "pkts"),
            ("udpOutDatagrams", "UdpTxDatagrams", "pkts"),
            ("udpInErrors", "UdpRxErrors", "pkts"),
            ("udpNoPorts", "UdpNoPortsErrors", "pkts"),
            ("ipInReceives", "IpRxPackets", "pkts"),
            ("ipInDelivers", "IpDeliveredPackets", "pkts"),
            ("ipOutRequests", "IpTxRequests", "pkts"),
            ("ipOutDiscards", "IpTxDiscards", "pkts"),
            ("ipInDiscards", "IpRxDiscards", "pkts"),
            ("ipForwDatagrams", "IpForwardedDatagrams", "pkts"),
            ("ipOutNoRoutes", "IpNoRoutePackets", "pkts"),
            ("ipInAddrErrors", "IpAddressErrors", "pkts"),
            ("icmpInMsgs", "IcmpRxMessages", "pkts"),
            ("icmpInDestUnreachs", "IcmpRxDestUnreach", "pkts"),
            ("icmpOutMsgs", "IcmpTxMessages", "pkts"),
            ("icmpOutDestUnreachs", "IcmpTxDestUnreach", "pkts"),
            ("icmpInEchos", "IcmpRxEchoRequests", "pkts"),
            ("icmpOutEchoReps", "IcmpTxEchoReplies", "pkts"),
        ];

        Self::new(
            ENTRIES
                .iter()
                .map(|(raw, standard, unit)| ColumnMapping::new(raw, standard, unit))
                .collect(),
        )
    }

    /// Standard name for a raw column, if mapped.
    pub fn standard_name(&self, raw: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.raw == raw)
            .map(|e| e.standard.as_str())
    }

    /// Unit of the first entry whose standard name matches, or "".
    pub fn unit_for(&self, standard: &str) -> &str {
        self.entries
            .iter()
            .find(|e| e.standard == standard)
            .map(|e| e.unit.as_str())
            .unwrap_or("")
    }

    /// Renames every mapped column; unmapped columns pass through untouched.
    pub fn standardize(&self, table: &mut DataTable) {
        table.rename_with(|name| self.standard_name(name).map(str::to_string));
    }

    /// Raw names that appear more than once.
    pub fn duplicate_raw_names(&self) -> Vec<&str> {
        let mut dups = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let seen_before = self.entries[..i].iter().any(|e| e.raw == entry.raw);
            if seen_before && !dups.contains(&entry.raw.as_str()) {
                dups.push(entry.raw.as_str());
            }
        }
        dups
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::snmp()
    }
}
