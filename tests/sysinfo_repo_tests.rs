// Smoke tests against the real sysinfo backend

use hostmon::sysinfo_repo::SysinfoRepo;

#[tokio::test]
async fn snapshot_reports_sane_host_values() {
    let repo = SysinfoRepo::new();
    let snapshot = repo.snapshot().await.expect("snapshot");
    assert!(snapshot.cpu.cores > 0);
    assert!(snapshot.memory.total > 0);
    assert!(snapshot.memory.used <= snapshot.memory.total);
    assert!(snapshot.timestamp > 0);
    assert!(snapshot.processes.len() <= 10);
    assert_eq!(snapshot.gpu.vendor, "Unknown");
}

#[tokio::test]
async fn snapshot_timestamps_are_non_decreasing() {
    let repo = SysinfoRepo::new();
    let first = repo.snapshot().await.expect("first snapshot");
    let second = repo.snapshot().await.expect("second snapshot");
    assert!(second.timestamp >= first.timestamp);
}

#[tokio::test]
async fn flows_collection_never_errors() {
    let repo = SysinfoRepo::new();
    let flows = repo.flows().await.expect("flows");
    for flow in &flows {
        assert!(flow.protocol == "TCP" || flow.protocol == "UDP");
        assert!(!flow.source_ip.is_empty());
    }
}
