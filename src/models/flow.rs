// Network flow models

use serde::{Deserialize, Serialize};

/// One active socket pair, reported as a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFlow {
    #[serde(rename = "sourceIP")]
    pub source_ip: String,
    #[serde(rename = "destIP")]
    pub dest_ip: String,
    pub source_port: u16,
    pub dest_port: u16,
    /// "TCP" or "UDP".
    pub protocol: String,
    /// Per-flow byte/packet counters are not exposed by the kernel tables; always 0.
    pub bytes: u64,
    pub packets: u64,
    pub timestamp: u64,
    /// "outbound" for established flows, "inbound" otherwise.
    pub direction: String,
}
