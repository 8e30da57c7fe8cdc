// CPU, memory, GPU, network, disk and process models for one snapshot

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuMetrics {
    pub usage: f64,
    pub cores: u32,
    /// Current frequency in MHz, 0 when unknown.
    pub frequency: u64,
    /// First temperature sensor reading; null when the host exposes none.
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetrics {
    pub used: u64,
    pub total: u64,
    pub available: u64,
    pub percentage: f64,
}

/// GPU group. Without a vendor binding in the stack this stays at the
/// "Unknown" fallback; the optional fields are omitted from the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub vendor: String,
    pub renderer: String,
}

impl GpuMetrics {
    pub fn unknown() -> Self {
        Self {
            usage: None,
            memory: None,
            temperature: None,
            vendor: "Unknown".into(),
            renderer: "Unknown".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetrics {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub packets_received: u64,
    pub packets_sent: u64,
    /// Open socket entries across TCP and UDP tables.
    pub connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskMetrics {
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// Usage percent of the root filesystem.
    pub usage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStat {
    pub pid: u32,
    pub name: String,
    pub cpu_usage: f64,
    /// Resident set size in bytes.
    pub memory_usage: u64,
    pub status: String,
}

/// One immutable collected measurement; produced fresh every tick,
/// never cached or diffed against the prior snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub gpu: GpuMetrics,
    pub network: NetworkMetrics,
    pub disk: DiskMetrics,
    pub processes: Vec<ProcessStat>,
    /// Milliseconds since epoch.
    pub timestamp: u64,
}
