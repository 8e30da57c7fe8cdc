// Linux-specific helpers: /proc/net socket tables and /proc/diskstats.

#[cfg(target_os = "linux")]
use std::net::Ipv4Addr;

use crate::models::NetworkFlow;

/// Parse one /proc/net/{tcp,udp} table. Returns (local, remote, state) per row.
#[cfg(target_os = "linux")]
fn parse_socket_table(path: &str) -> Vec<(Ipv4Addr, u16, Ipv4Addr, u16, u8)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _sl = fields.next()?;
            let local = fields.next()?;
            let remote = fields.next()?;
            let state = u8::from_str_radix(fields.next()?, 16).ok()?;
            let (laddr, lport) = parse_endpoint(local)?;
            let (raddr, rport) = parse_endpoint(remote)?;
            Some((laddr, lport, raddr, rport, state))
        })
        .collect()
}

/// Endpoints are printed as native-endian hex, e.g. "0100007F:1F90" for 127.0.0.1:8080.
#[cfg(target_os = "linux")]
fn parse_endpoint(s: &str) -> Option<(Ipv4Addr, u16)> {
    let (addr_hex, port_hex) = s.split_once(':')?;
    if addr_hex.len() != 8 {
        return None;
    }
    let addr = u32::from_str_radix(addr_hex, 16).ok()?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;
    Some((Ipv4Addr::from(addr.swap_bytes()), port))
}

/// TCP_ESTABLISHED in /proc/net/tcp state column.
#[cfg(target_os = "linux")]
const TCP_ESTABLISHED: u8 = 0x01;

/// Active socket pairs as flows: entries with a real remote endpoint, up to `limit`.
pub(super) fn read_network_flows(limit: usize, timestamp: u64) -> Vec<NetworkFlow> {
    #[cfg(target_os = "linux")]
    {
        let mut flows = Vec::new();
        for (path, protocol) in [("/proc/net/tcp", "TCP"), ("/proc/net/udp", "UDP")] {
            for (laddr, lport, raddr, rport, state) in parse_socket_table(path) {
                if raddr.is_unspecified() && rport == 0 {
                    continue;
                }
                flows.push(NetworkFlow {
                    source_ip: laddr.to_string(),
                    dest_ip: raddr.to_string(),
                    source_port: lport,
                    dest_port: rport,
                    protocol: protocol.into(),
                    bytes: 0,
                    packets: 0,
                    timestamp,
                    direction: if protocol == "TCP" && state == TCP_ESTABLISHED {
                        "outbound".into()
                    } else {
                        "inbound".into()
                    },
                });
                if flows.len() >= limit {
                    return flows;
                }
            }
        }
        flows
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = (limit, timestamp);
        Vec::new()
    }
}

/// Total socket entries across the TCP and UDP tables (v4 and v6).
pub(super) fn count_socket_entries() -> u32 {
    #[cfg(target_os = "linux")]
    {
        let mut count = 0usize;
        for path in [
            "/proc/net/tcp",
            "/proc/net/tcp6",
            "/proc/net/udp",
            "/proc/net/udp6",
        ] {
            if let Ok(content) = std::fs::read_to_string(path) {
                count += content.lines().skip(1).count();
            }
        }
        count.min(u32::MAX as usize) as u32
    }
    #[cfg(not(target_os = "linux"))]
    {
        0
    }
}

/// Cumulative (read_bytes, write_bytes) across whole disk devices from
/// /proc/diskstats. Sectors are 512 bytes regardless of the device sector size.
pub(super) fn read_disk_io() -> Option<(u64, u64)> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/diskstats").ok()?;
        let mut read_bytes = 0u64;
        let mut write_bytes = 0u64;
        for line in content.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                continue;
            }
            let name = fields[2];
            if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram") {
                continue;
            }
            // Partitions are already counted by their parent device.
            if is_partition(name) {
                continue;
            }
            let sectors_read: u64 = fields[5].parse().unwrap_or(0);
            let sectors_written: u64 = fields[9].parse().unwrap_or(0);
            read_bytes += sectors_read * 512;
            write_bytes += sectors_written * 512;
        }
        Some((read_bytes, write_bytes))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// CPU model string from /proc/cpuinfo.
pub(super) fn read_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        content.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim() == "model name" {
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            } else {
                None
            }
        })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(target_os = "linux")]
fn is_partition(name: &str) -> bool {
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        // nvme0n1p1, mmcblk0p1
        name.contains('p') && name.chars().last().is_some_and(|c| c.is_ascii_digit())
    } else {
        // sda1, vdb2
        name.chars().last().is_some_and(|c| c.is_ascii_digit())
    }
}
