// Shared test helpers

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use hostmon::broadcaster::MetricsSource;
use hostmon::models::*;

pub fn sample_snapshot(cpu_usage: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        cpu: CpuMetrics {
            usage: cpu_usage,
            cores: 4,
            frequency: 2400,
            temperature: None,
        },
        memory: MemoryMetrics {
            used: 50,
            total: 100,
            available: 50,
            percentage: 50.0,
        },
        gpu: GpuMetrics::unknown(),
        network: NetworkMetrics {
            bytes_received: 0,
            bytes_sent: 0,
            packets_received: 0,
            packets_sent: 0,
            connections: 0,
        },
        disk: DiskMetrics {
            read_bytes: 0,
            write_bytes: 0,
            usage: 10.0,
        },
        processes: vec![],
        timestamp: 42,
    }
}

pub fn sample_flow() -> NetworkFlow {
    NetworkFlow {
        source_ip: "127.0.0.1".into(),
        dest_ip: "10.0.0.2".into(),
        source_port: 50000,
        dest_port: 443,
        protocol: "TCP".into(),
        bytes: 0,
        packets: 0,
        timestamp: 42,
        direction: "outbound".into(),
    }
}

/// Metrics source with call counters and switchable failure modes.
#[derive(Default)]
pub struct StubSource {
    pub metrics_calls: AtomicUsize,
    pub flows_calls: AtomicUsize,
    pub fail_metrics: AtomicBool,
    pub flows: Mutex<Vec<NetworkFlow>>,
}

impl StubSource {
    pub fn with_flows(flows: Vec<NetworkFlow>) -> Self {
        Self {
            flows: Mutex::new(flows),
            ..Default::default()
        }
    }

    pub fn metrics_calls(&self) -> usize {
        self.metrics_calls.load(Ordering::SeqCst)
    }

    pub fn flows_calls(&self) -> usize {
        self.flows_calls.load(Ordering::SeqCst)
    }
}

impl MetricsSource for StubSource {
    async fn collect_metrics(&self) -> anyhow::Result<MetricsSnapshot> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_metrics.load(Ordering::SeqCst) {
            anyhow::bail!("collection failed");
        }
        Ok(sample_snapshot(10.0))
    }

    async fn collect_flows(&self) -> anyhow::Result<Vec<NetworkFlow>> {
        self.flows_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.flows.lock().unwrap().clone())
    }
}
