use crate::handle::{Command, SyncHandle};
use crate::timer::PollTimer;
use crate::{SchedulerState, SyncConfig, SyncEvent, SyncStatus};
use domain::Snapshot;
use pyro_protocol::{FieldLink, FieldLinkError};
use pyro_telemetry::{record_poll_cycle, record_snapshot_dropped, record_snapshot_published};
use pyro_transport::{PublishOutcome, SnapshotPublisher};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 16;
const EVENT_CAPACITY: usize = 64;

/// 启动调度任务，返回操作句柄与任务句柄。
pub fn spawn(
    field_link: FieldLink,
    publisher: Arc<dyn SnapshotPublisher>,
    config: SyncConfig,
) -> (SyncHandle, JoinHandle<()>) {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (status_tx, status_rx) = watch::channel(SyncStatus::default());
    let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

    let scheduler = Scheduler {
        field_link,
        publisher,
        timer: PollTimer::new(config.poll_interval),
        config,
        state: SchedulerState::Idle,
        snapshot: None,
        status: status_tx,
        events: events_tx.clone(),
    };
    let task = tokio::spawn(scheduler.run(commands_rx));
    (SyncHandle::new(commands_tx, status_rx, events_tx), task)
}

struct Scheduler {
    field_link: FieldLink,
    publisher: Arc<dyn SnapshotPublisher>,
    config: SyncConfig,
    timer: PollTimer,
    state: SchedulerState,
    snapshot: Option<Snapshot>,
    status: watch::Sender<SyncStatus>,
    events: broadcast::Sender<SyncEvent>,
}

impl Scheduler {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(
            target: "pyro.sync",
            poll_interval_ms = self.timer.period().as_millis() as u64,
            channel = %self.config.channel,
            "scheduler_started"
        );
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Connect { plant_id, com_port, reply }) => {
                        let result = self.connect(&plant_id, &com_port).await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Disconnect { reply }) => {
                        let was_connected = self.disconnect();
                        let _ = reply.send(was_connected);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                () = self.timer.tick() => self.run_cycle().await,
            }
        }

        self.field_link.disconnect();
        self.enter_idle();
        info!(target: "pyro.sync", "scheduler_stopped");
    }

    async fn connect(&mut self, plant_id: &str, com_port: &str) -> Result<bool, FieldLinkError> {
        if self.field_link.is_connected() {
            // 已在轮询：端点与节拍都保持不变
            return self.field_link.connect(plant_id, com_port).await;
        }

        self.field_link.connect(plant_id, com_port).await?;
        let endpoint = self.field_link.endpoint().cloned().unwrap_or_default();
        self.state = SchedulerState::Polling;
        self.publish_status();
        self.emit(SyncEvent::FieldLinkConnected(endpoint));
        info!(target: "pyro.sync", "scheduler_polling");

        self.run_cycle().await;
        if self.field_link.is_connected() {
            self.timer.arm();
        }
        Ok(true)
    }

    fn disconnect(&mut self) -> bool {
        let was_connected = self.field_link.disconnect();
        self.enter_idle();
        if was_connected {
            self.emit(SyncEvent::FieldLinkClosed);
        }
        was_connected
    }

    /// 一轮采集-发布。
    async fn run_cycle(&mut self) {
        if !self.field_link.is_connected() {
            self.enter_idle();
            return;
        }
        record_poll_cycle();

        let snapshot = match self.field_link.read_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let reason = err.to_string();
                self.enter_idle();
                warn!(target: "pyro.sync", reason = %reason, "field_link_lost");
                self.emit(SyncEvent::FieldLinkLost { reason });
                return;
            }
        };

        self.snapshot = Some(snapshot.clone());
        self.publish_status();
        self.emit(SyncEvent::SnapshotUpdated(snapshot.clone()));

        if !self.publisher.is_connected() {
            self.record_drop("transport_disconnected");
            return;
        }
        match self.publisher.publish(&self.config.channel, &snapshot).await {
            Ok(PublishOutcome::Published) => {
                record_snapshot_published();
                debug!(
                    target: "pyro.sync",
                    channel = %self.config.channel,
                    id = snapshot.id,
                    "snapshot_published"
                );
                self.emit(SyncEvent::SnapshotPublished);
            }
            Ok(PublishOutcome::Dropped) => self.record_drop("transport_disconnected"),
            Err(err) => {
                warn!(target: "pyro.sync", error = %err, "snapshot_publish_failed");
                self.record_drop("publish_failed");
            }
        }
    }

    fn enter_idle(&mut self) {
        self.timer.disarm();
        self.snapshot = None;
        if self.state != SchedulerState::Idle {
            info!(target: "pyro.sync", "scheduler_idle");
        }
        self.state = SchedulerState::Idle;
        self.publish_status();
    }

    fn record_drop(&self, reason: &'static str) {
        record_snapshot_dropped();
        debug!(target: "pyro.sync", reason = reason, "snapshot_dropped");
        self.emit(SyncEvent::SnapshotDropped);
    }

    fn publish_status(&self) {
        self.status.send_replace(SyncStatus {
            field_link: self.field_link.state(),
            scheduler: self.state,
            endpoint: self.field_link.endpoint().cloned(),
            snapshot: self.snapshot.clone(),
        });
    }

    fn emit(&self, event: SyncEvent) {
        // 无订阅者时发送失败，忽略即可
        let _ = self.events.send(event);
    }
}
