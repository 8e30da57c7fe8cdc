// Wire models (dashboard protocol)

mod exec;
mod flow;
mod metrics;

pub use exec::{ExecMethod, ExecutionRecord};
pub use flow::NetworkFlow;
pub use metrics::{
    CpuMetrics, DiskMetrics, GpuMetrics, MemoryMetrics, MetricsSnapshot, NetworkMetrics,
    ProcessStat,
};
