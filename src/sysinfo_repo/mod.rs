// System stats via sysinfo

mod linux;

use std::sync::Arc;
use std::time::Instant;

use sysinfo::{Components, Disks, Networks, ProcessesToUpdate, System};
use tracing::instrument;

use crate::broadcaster::MetricsSource;
use crate::models::*;

/// Processes reported per snapshot, highest CPU usage first.
const TOP_PROCESS_LIMIT: usize = 10;

/// Flow entries reported per snapshot.
const FLOW_LIMIT: usize = 20;

pub struct SysinfoRepo {
    sys: Arc<std::sync::Mutex<System>>,
    disks: Arc<std::sync::Mutex<Disks>>,
    networks: Arc<std::sync::Mutex<Networks>>,
    components: Arc<std::sync::Mutex<Components>>,
    last_cpu_refresh: Arc<std::sync::Mutex<Option<(Instant, f64)>>>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl SysinfoRepo {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();
        let components = Components::new_with_refreshed_list();
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
            disks: Arc::new(std::sync::Mutex::new(disks)),
            networks: Arc::new(std::sync::Mutex::new(networks)),
            components: Arc::new(std::sync::Mutex::new(components)),
            last_cpu_refresh: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "snapshot"))]
    pub async fn snapshot(&self) -> anyhow::Result<MetricsSnapshot> {
        let sys = self.sys.clone();
        let disks = self.disks.clone();
        let networks = self.networks.clone();
        let components = self.components.clone();
        let last_cpu_refresh = self.last_cpu_refresh.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;

            let cpu = collect_cpu(&mut sys, &last_cpu_refresh, &components);
            let memory = collect_memory(&mut sys);
            let network = collect_network(&networks)?;
            let disk = collect_disk(&disks)?;
            let processes = collect_processes(&mut sys);

            Ok(MetricsSnapshot {
                cpu,
                memory,
                gpu: GpuMetrics::unknown(),
                network,
                disk,
                processes,
                timestamp: timestamp_ms(),
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "flows"))]
    pub async fn flows(&self) -> anyhow::Result<Vec<NetworkFlow>> {
        tokio::task::spawn_blocking(move || Ok(linux::read_network_flows(FLOW_LIMIT, timestamp_ms())))
            .await
            .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

/// Human-readable CPU model, matching Python's `platform.processor()`; falls
/// back to the target architecture when /proc/cpuinfo has no model name.
pub fn processor_name() -> String {
    linux::read_cpu_model().unwrap_or_else(|| std::env::consts::ARCH.to_string())
}

impl MetricsSource for SysinfoRepo {
    async fn collect_metrics(&self) -> anyhow::Result<MetricsSnapshot> {
        self.snapshot().await
    }

    async fn collect_flows(&self) -> anyhow::Result<Vec<NetworkFlow>> {
        self.flows().await
    }
}

fn collect_cpu(
    sys: &mut System,
    last_cpu_refresh: &std::sync::Mutex<Option<(Instant, f64)>>,
    components: &Arc<std::sync::Mutex<Components>>,
) -> CpuMetrics {
    let now = Instant::now();
    let usage = if let Ok(mut guard) = last_cpu_refresh.lock() {
        if let Some((prev_ts, prev_usage)) = *guard {
            if now.duration_since(prev_ts) >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
                sys.refresh_cpu_all();
                let new_usage = sys.global_cpu_usage() as f64;
                *guard = Some((now, new_usage));
                new_usage
            } else {
                // Too soon for a meaningful delta, reuse the last reading
                prev_usage
            }
        } else {
            // First call establishes the baseline
            sys.refresh_cpu_all();
            *guard = Some((now, 0.0));
            0.0
        }
    } else {
        sys.refresh_cpu_all();
        0.0
    };

    let frequency = sys.cpus().first().map(|c| c.frequency()).unwrap_or(0);
    let temperature = components.lock().ok().and_then(|mut comps| {
        comps.refresh(false);
        comps
            .list()
            .iter()
            .find_map(|c| c.temperature())
            .map(f64::from)
    });

    CpuMetrics {
        usage: usage.clamp(0.0, 100.0),
        cores: sys.cpus().len() as u32,
        frequency,
        temperature,
    }
}

fn collect_memory(sys: &mut System) -> MemoryMetrics {
    sys.refresh_memory();
    let total = sys.total_memory();
    let available = sys.available_memory();
    let used = total.saturating_sub(available);
    let percentage = if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    MemoryMetrics {
        used,
        total,
        available,
        percentage,
    }
}

fn collect_network(networks: &Arc<std::sync::Mutex<Networks>>) -> anyhow::Result<NetworkMetrics> {
    let mut networks = networks
        .lock()
        .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
    networks.refresh(true);
    let mut metrics = NetworkMetrics {
        bytes_received: 0,
        bytes_sent: 0,
        packets_received: 0,
        packets_sent: 0,
        connections: linux::count_socket_entries(),
    };
    for (_, data) in networks.list() {
        metrics.bytes_received += data.total_received();
        metrics.bytes_sent += data.total_transmitted();
        metrics.packets_received += data.total_packets_received();
        metrics.packets_sent += data.total_packets_transmitted();
    }
    Ok(metrics)
}

fn collect_disk(disks: &Arc<std::sync::Mutex<Disks>>) -> anyhow::Result<DiskMetrics> {
    let mut disks = disks
        .lock()
        .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
    disks.refresh(false);

    // Usage of the root filesystem; fall back to the largest mount when
    // nothing is mounted at "/" (e.g. some containers).
    let usage = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.list().iter().max_by_key(|d| d.total_space()))
        .map(|d| {
            let total = d.total_space();
            let used = total.saturating_sub(d.available_space());
            if total > 0 {
                (used as f64 / total as f64) * 100.0
            } else {
                0.0
            }
        })
        .unwrap_or(0.0);

    let (read_bytes, write_bytes) = linux::read_disk_io().unwrap_or((0, 0));
    Ok(DiskMetrics {
        read_bytes,
        write_bytes,
        usage,
    })
}

fn collect_processes(sys: &mut System) -> Vec<ProcessStat> {
    sys.refresh_processes(ProcessesToUpdate::All, true);
    let mut processes: Vec<ProcessStat> = sys
        .processes()
        .values()
        .map(|p| ProcessStat {
            pid: p.pid().as_u32(),
            name: p.name().to_string_lossy().into_owned(),
            cpu_usage: p.cpu_usage() as f64,
            memory_usage: p.memory(),
            status: p.status().to_string(),
        })
        .collect();
    processes.sort_by(|a, b| b.cpu_usage.total_cmp(&a.cpu_usage));
    processes.truncate(TOP_PROCESS_LIMIT);
    processes
}
