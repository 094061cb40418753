use crate::{SyncError, SyncEvent, SyncStatus};
use domain::{LinkState, Snapshot};
use pyro_protocol::FieldLinkError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

pub(crate) enum Command {
    Connect {
        plant_id: String,
        com_port: String,
        reply: oneshot::Sender<Result<bool, FieldLinkError>>,
    },
    Disconnect {
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// 面向展示层的调度器句柄。
///
/// 命令经通道交给调度任务串行执行；查询直接读取最新状态，不经过调度任务。
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SyncStatus>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        status: watch::Receiver<SyncStatus>,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            commands,
            status,
            events,
        }
    }

    /// 打开现场链路并开始轮询。
    ///
    /// 成功时在首轮采集完成后返回；已连接时不做任何改变并返回 `true`。
    pub async fn connect(&self, plant_id: &str, com_port: &str) -> Result<bool, SyncError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Connect {
                plant_id: plant_id.to_string(),
                com_port: com_port.to_string(),
                reply,
            })
            .await
            .map_err(|_| SyncError::Stopped)?;
        response
            .await
            .map_err(|_| SyncError::Stopped)?
            .map_err(SyncError::Connect)
    }

    /// 断开现场链路；返回断开前是否已连接。
    pub async fn disconnect_field_link(&self) -> Result<bool, SyncError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Disconnect { reply })
            .await
            .map_err(|_| SyncError::Stopped)?;
        response.await.map_err(|_| SyncError::Stopped)
    }

    /// 停止调度任务（会断开现场链路）。
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| SyncError::Stopped)
    }

    pub fn is_field_link_connected(&self) -> bool {
        self.status.borrow().field_link == LinkState::Connected
    }

    pub fn latest_snapshot(&self) -> Option<Snapshot> {
        self.status.borrow().snapshot.clone()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// 事件订阅（broadcast 语义，慢订阅者会丢事件）。
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }
}
