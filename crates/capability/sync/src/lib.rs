//! # 轮询-发布调度
//!
//! 固定周期地从现场链路取一份快照，转发链路可用时发布到实时通道，否则丢弃。
//!
//! ```text
//!            connect 成功                      读失败 / disconnect
//!   Idle ─────────────────▶ Polling ─────────────────────────────▶ Idle
//!                         (立即一轮 + 武装定时器)       (撤销定时器 + 清空快照)
//! ```
//!
//! 调度器独占一个 tokio 任务：命令、定时器 tick 都在同一个循环里串行处理，
//! 一轮采集-发布未结束前不会开始下一轮；期间到期的 tick 被合并。
//! 外部通过 [`SyncHandle`] 发命令、拉取状态、订阅事件。

mod handle;
mod scheduler;
mod timer;

pub use handle::SyncHandle;
pub use scheduler::spawn;

use domain::{EndpointConfig, LinkState, Snapshot};
use pyro_protocol::FieldLinkError;
use std::time::Duration;

/// 调度错误。
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Connect(FieldLinkError),
    #[error("scheduler stopped")]
    Stopped,
}

/// 调度参数。
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    /// 发布通道
    pub channel: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            channel: "realtime".to_string(),
        }
    }
}

/// 调度器状态。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulerState {
    /// 现场链路断开，定时器未武装
    #[default]
    Idle,
    /// 现场链路已连接，按周期采集
    Polling,
}

/// 可拉取的调度状态。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub field_link: LinkState,
    pub scheduler: SchedulerState,
    pub endpoint: Option<EndpointConfig>,
    /// 最近一份快照；链路断开即清空
    pub snapshot: Option<Snapshot>,
}

/// 状态变化通知。
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    FieldLinkConnected(EndpointConfig),
    /// 读失败导致链路丢失
    FieldLinkLost { reason: String },
    /// 操作员显式断开
    FieldLinkClosed,
    SnapshotUpdated(Snapshot),
    SnapshotPublished,
    SnapshotDropped,
}
