//! 日志初始化与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub poll_cycles: u64,
    pub read_failures: u64,
    pub snapshots_published: u64,
    pub snapshots_dropped: u64,
    pub field_link_connects: u64,
    pub field_link_connect_failures: u64,
    pub transport_connects: u64,
    pub transport_errors: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    poll_cycles: AtomicU64,
    read_failures: AtomicU64,
    snapshots_published: AtomicU64,
    snapshots_dropped: AtomicU64,
    field_link_connects: AtomicU64,
    field_link_connect_failures: AtomicU64,
    transport_connects: AtomicU64,
    transport_errors: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            poll_cycles: AtomicU64::new(0),
            read_failures: AtomicU64::new(0),
            snapshots_published: AtomicU64::new(0),
            snapshots_dropped: AtomicU64::new(0),
            field_link_connects: AtomicU64::new(0),
            field_link_connect_failures: AtomicU64::new(0),
            transport_connects: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            poll_cycles: self.poll_cycles.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            snapshots_published: self.snapshots_published.load(Ordering::Relaxed),
            snapshots_dropped: self.snapshots_dropped.load(Ordering::Relaxed),
            field_link_connects: self.field_link_connects.load(Ordering::Relaxed),
            field_link_connect_failures: self.field_link_connect_failures.load(Ordering::Relaxed),
            transport_connects: self.transport_connects.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 记录一次轮询周期。
pub fn record_poll_cycle() {
    metrics().poll_cycles.fetch_add(1, Ordering::Relaxed);
}

/// 记录读失败（每次都会导致现场链路断开）。
pub fn record_read_failure() {
    metrics().read_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录快照发布次数。
pub fn record_snapshot_published() {
    metrics().snapshots_published.fetch_add(1, Ordering::Relaxed);
}

/// 记录快照丢弃次数（转发链路不可用）。
pub fn record_snapshot_dropped() {
    metrics().snapshots_dropped.fetch_add(1, Ordering::Relaxed);
}

pub fn record_field_link_connect() {
    metrics().field_link_connects.fetch_add(1, Ordering::Relaxed);
}

pub fn record_field_link_connect_failure() {
    metrics()
        .field_link_connect_failures
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_transport_connect() {
    metrics().transport_connects.fetch_add(1, Ordering::Relaxed);
}

pub fn record_transport_error() {
    metrics().transport_errors.fetch_add(1, Ordering::Relaxed);
}
