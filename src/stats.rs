//! 仪表盘快照：并发拉取四个列表和 /info，全部成功才计算指标

use std::thread;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::engine::{ContainerView, EngineApi, HostInfo};
use crate::utils::Result;

const GIB: f64 = (1u64 << 30) as f64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMetrics {
    /// 运行中容器数 / CPU 数，并不是真实的 CPU 占用
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub memory_limit_gb: f64,
    pub total_images: usize,
    pub running_containers: usize,
    pub stopped_containers: usize,
    pub total_containers: usize,
    pub total_networks: usize,
    pub total_volumes: usize,
}

/// 先判断变体再读指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HostSnapshot {
    Available(HostMetrics),
    Unavailable { error: String },
}

impl HostSnapshot {
    pub fn metrics(&self) -> Option<&HostMetrics> {
        match self {
            HostSnapshot::Available(m) => Some(m),
            HostSnapshot::Unavailable { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            HostSnapshot::Available(_) => None,
            HostSnapshot::Unavailable { error } => Some(error),
        }
    }
}

// ── 聚合 ────────────────────────────────────────────────────────────────────

pub fn host_snapshot<E: EngineApi + ?Sized>(engine: &E) -> HostSnapshot {
    let (containers, images, networks, volumes, info) = thread::scope(|s| {
        let containers = s.spawn(|| engine.list_containers(true));
        let images     = s.spawn(|| engine.list_images());
        let networks   = s.spawn(|| engine.list_networks());
        let volumes    = s.spawn(|| engine.list_volumes());
        let info       = s.spawn(|| engine.host_info());
        (
            join(containers),
            join(images),
            join(networks),
            join(volumes),
            join(info),
        )
    });

    let collected = (|| -> Result<_> {
        Ok((containers?, images?.len(), networks?.len(), volumes?.len(), info?))
    })();

    match collected {
        Ok((containers, total_images, total_networks, total_volumes, info)) => {
            let metrics = compute_metrics(&containers, total_images, total_networks, total_volumes, &info);
            debug!(containers = metrics.total_containers, images = total_images, "host snapshot collected");
            HostSnapshot::Available(metrics)
        }
        Err(e) => {
            warn!(error = %e, "host snapshot unavailable");
            HostSnapshot::Unavailable { error: e.to_string() }
        }
    }
}

pub fn compute_metrics(
    containers: &[ContainerView],
    total_images: usize,
    total_networks: usize,
    total_volumes: usize,
    info: &HostInfo,
) -> HostMetrics {
    let running_containers = containers.iter().filter(|c| c.state.is_running()).count();

    let cpu_usage_percent = if info.ncpu > 0 {
        info.containers_running as f64 / info.ncpu as f64 * 100.0
    } else { 0.0 };

    // MemAvailable 缺失时无法计算，记 0
    let memory_usage_percent = match info.mem_available {
        Some(avail) if info.mem_total > 0 => {
            info.mem_total.saturating_sub(avail) as f64 / info.mem_total as f64 * 100.0
        }
        _ => 0.0,
    };

    HostMetrics {
        cpu_usage_percent,
        memory_usage_percent,
        memory_limit_gb: info.mem_total as f64 / GIB,
        total_images,
        running_containers,
        stopped_containers: containers.len() - running_containers,
        total_containers: containers.len(),
        total_networks,
        total_volumes,
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle.join().unwrap_or_else(|p| std::panic::resume_unwind(p))
}
