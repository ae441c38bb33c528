//! Metric taxonomy: categories of chart subgroups.

use serde::{Deserialize, Serialize};

/// A top-level category and its ordered chart subgroups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetricCategory {
    pub name: String,
    /// Each subgroup is plotted together on one chart.
    pub subgroups: Vec<Vec<String>>,
}

impl MetricCategory {
    pub fn new(name: &str, subgroups: &[&[&str]]) -> Self {
        Self {
            name: name.to_string(),
            subgroups: subgroups
                .iter()
                .map(|group| group.iter().map(|m| m.to_string()).collect())
                .collect(),
        }
    }
}

/// Two-level grouping of standardized metric names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetricTaxonomy {
    pub categories: Vec<MetricCategory>,
}

impl MetricTaxonomy {
    pub fn new(categories: Vec<MetricCategory>) -> Self {
        Self { categories }
    }

    /// Network, TCP, UDP, IP and ICMP groupings of the SNMP counters.
    pub fn snmp() -> Self {
        Self::new(vec![
            MetricCategory::new(
                "Network",
                &[
                    &["RxBytes", "TxBytes"],
                    &["TxDiscards", "RxDiscards"],
                    &["TxNonUnicastPkts", "RxNonUnicastPkts"],
                    &["TxUnicastPkts", "RxUnicastPkts"],
                ],
            ),
            MetricCategory::new(
                "TCP",
                &[
                    &["TcpTxResets"],
                    &["TcpRxSegments", "TcpTxSegments"],
                    &["TcpRetransmissions"],
                    &["TcpPassiveOpens", "TcpActiveOpens"],
                    &["TcpEstabResets", "TcpCurrentConnections"],
                ],
            ),
            MetricCategory::new(
                "UDP",
                &[
                    &["UdpRxDatagrams", "UdpTxDatagrams"],
                    &["UdpRxErrors", "UdpNoPortsErrors"],
                ],
            ),
            MetricCategory::new(
                "IP",
                &[
                    &["IpRxPackets", "IpForwardedDatagrams"],
                    &["IpDeliveredPackets", "IpTxRequests"],
                    &["IpTxDiscards", "IpRxDiscards"],
                    &["IpNoRoutePackets", "IpAddressErrors"],
                ],
            ),
            MetricCategory::new(
                "ICMP",
                &[
                    &["IcmpRxMessages", "IcmpRxDestUnreach"],
                    &["IcmpTxMessages", "IcmpTxDestUnreach"],
                    &["IcmpRxEchoRequests", "IcmpTxEchoReplies"],
                ],
            ),
        ])
    }

    pub fn category(&self, name: &str) -> Option<&MetricCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for MetricTaxonomy {
    fn default() -> Self {
        Self::snmp()
    }
}
