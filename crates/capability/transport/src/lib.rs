//! 转发链路：把快照发布到 MQTT 实时通道。
//!
//! 发布是"尽力而为"：链路未连接时直接丢弃，不排队、不重试、不施加背压。
//! 重连完全交给 rumqttc 事件循环，这里只把其事件映射为 `TransportState`。

use async_trait::async_trait;
use domain::{Snapshot, TransportState};
use pyro_telemetry::{record_transport_connect, record_transport_error};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 转发链路错误（从不致命）。
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("payload error: {0}")]
    Payload(String),
    #[error("publish error: {0}")]
    Publish(String),
}

/// 单次发布的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// 链路未连接，按设计丢弃
    Dropped,
}

/// 快照发布器抽象。
#[async_trait]
pub trait SnapshotPublisher: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn publish(
        &self,
        channel: &str,
        snapshot: &Snapshot,
    ) -> Result<PublishOutcome, TransportError>;
}

/// 转发链路配置。
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// 通道前缀，空则直接使用通道名作为 topic
    pub topic_prefix: String,
    pub qos: u8,
    pub keep_alive: Duration,
    pub auto_reconnect: bool,
    pub reconnect_delay: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            username: None,
            password: None,
            topic_prefix: String::new(),
            qos: 0,
            keep_alive: Duration::from_secs(30),
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// 一次 connect 建立的客户端与事件循环任务。
struct Session {
    client: AsyncClient,
    driver: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// 链路状态与会话代数。
///
/// 每次 disconnect 代数加一；状态写入与代数比较在 watch 的写锁内完成，
/// 已退役会话的事件循环因此无法覆盖新状态。
struct LinkStatus {
    state: watch::Sender<TransportState>,
    generation: AtomicU64,
}

impl LinkStatus {
    fn new() -> Self {
        let (state, _) = watch::channel(TransportState::Disconnected);
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 以 `generation` 会话的身份写状态；会话已退役或状态未变时返回 `false`。
    fn set_for(&self, generation: u64, next: TransportState) -> bool {
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation || *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    /// 退役当前会话并置为断开。
    fn retire(&self) {
        self.state.send_modify(|current| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *current = TransportState::Disconnected;
        });
    }
}

/// 转发链路管理器。
pub struct TransportLink {
    config: TransportConfig,
    qos: QoS,
    status: Arc<LinkStatus>,
    session: Mutex<Option<Session>>,
}

impl TransportLink {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            qos: qos_from_u8(config.qos),
            config,
            status: Arc::new(LinkStatus::new()),
            session: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TransportState {
        *self.status.state.borrow()
    }

    /// 订阅状态变化（Connected / Connecting / Disconnected）。
    pub fn subscribe_state(&self) -> watch::Receiver<TransportState> {
        self.status.state.subscribe()
    }

    /// 建立连接；已连接或连接中时不做任何事。
    ///
    /// 需在 tokio 运行时内调用。
    pub fn connect(&self) {
        let mut session = self.lock_session();
        if session.as_ref().is_some_and(|s| !s.driver.is_finished()) {
            debug!(target: "pyro.transport", state = ?self.state(), "transport_connect_ignored");
            return;
        }

        let client_id = format!("pyro-dashboard-{}", uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(self.config.keep_alive);
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }
        let (client, eventloop) = AsyncClient::new(options, 10);

        let generation = self.status.generation();
        self.status.set_for(generation, TransportState::Connecting);
        info!(
            target: "pyro.transport",
            host = %self.config.host,
            port = self.config.port,
            "transport_connecting"
        );
        let driver = tokio::spawn(drive(
            eventloop,
            self.status.clone(),
            generation,
            self.config.auto_reconnect,
            self.config.reconnect_delay,
        ));
        *session = Some(Session { client, driver });
    }

    /// 断开并停止自动重连，直到再次调用 `connect`。
    pub fn disconnect(&self) {
        let session = self.lock_session().take();
        if session.is_some() {
            info!(target: "pyro.transport", "transport_disconnected_by_request");
        }
        self.status.retire();
        drop(session);
    }

    /// 通道对应的 topic
    pub fn topic_for(&self, channel: &str) -> String {
        let prefix = self.config.topic_prefix.trim_matches('/');
        if prefix.is_empty() {
            channel.to_string()
        } else {
            format!("{}/{}", prefix, channel.trim_start_matches('/'))
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SnapshotPublisher for TransportLink {
    fn is_connected(&self) -> bool {
        self.state() == TransportState::Connected
    }

    async fn publish(
        &self,
        channel: &str,
        snapshot: &Snapshot,
    ) -> Result<PublishOutcome, TransportError> {
        if !self.is_connected() {
            return Ok(PublishOutcome::Dropped);
        }
        let Some(client) = self.lock_session().as_ref().map(|s| s.client.clone()) else {
            return Ok(PublishOutcome::Dropped);
        };

        let payload =
            serde_json::to_vec(snapshot).map_err(|err| TransportError::Payload(err.to_string()))?;
        let topic = self.topic_for(channel);
        debug!(
            target: "pyro.transport",
            topic = %topic,
            payload_size = payload.len(),
            "snapshot_publish"
        );
        client
            .try_publish(topic, self.qos, false, payload)
            .map_err(|err| TransportError::Publish(err.to_string()))?;
        Ok(PublishOutcome::Published)
    }
}

/// 驱动 MQTT 事件循环并同步状态。
async fn drive(
    mut eventloop: EventLoop,
    status: Arc<LinkStatus>,
    generation: u64,
    auto_reconnect: bool,
    reconnect_delay: Duration,
) {
    while status.generation() == generation {
        let event = eventloop.poll().await;
        if let Some(next) = state_after(&event) {
            let changed = status.set_for(generation, next);
            if changed && next == TransportState::Connected {
                record_transport_connect();
                info!(target: "pyro.transport", "transport_connected");
            }
        }

        if let Err(err) = event {
            record_transport_error();
            warn!(target: "pyro.transport", error = %err, "transport_eventloop_error");
            if !auto_reconnect {
                info!(target: "pyro.transport", "transport_auto_reconnect_disabled");
                return;
            }
            tokio::time::sleep(reconnect_delay).await;
            status.set_for(generation, TransportState::Connecting);
        }
    }
}

/// 事件循环结果对应的链路状态；`None` 表示不改变。
pub fn state_after(event: &Result<Event, ConnectionError>) -> Option<TransportState> {
    match event {
        Ok(Event::Incoming(Packet::ConnAck(ack))) => {
            if ack.code == ConnectReturnCode::Success {
                Some(TransportState::Connected)
            } else {
                Some(TransportState::Disconnected)
            }
        }
        Ok(Event::Incoming(Packet::Disconnect)) | Ok(Event::Outgoing(Outgoing::Disconnect)) => {
            Some(TransportState::Disconnected)
        }
        Ok(_) => None,
        Err(_) => Some(TransportState::Disconnected),
    }
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::ConnAck;

    #[test]
    fn connack_success_means_connected() {
        let event = Ok(Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
        })));
        assert_eq!(state_after(&event), Some(TransportState::Connected));
    }

    #[test]
    fn refused_connack_means_disconnected() {
        let event = Ok(Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::NotAuthorized,
        })));
        assert_eq!(state_after(&event), Some(TransportState::Disconnected));
    }

    #[test]
    fn eventloop_error_means_disconnected() {
        let event = Err(ConnectionError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        )));
        assert_eq!(state_after(&event), Some(TransportState::Disconnected));
    }

    #[test]
    fn ping_does_not_change_state() {
        let event = Ok(Event::Incoming(Packet::PingResp));
        assert_eq!(state_after(&event), None);
        let event = Ok(Event::Outgoing(Outgoing::PingReq));
        assert_eq!(state_after(&event), None);
    }

    #[test]
    fn retired_session_cannot_overwrite_state() {
        let status = LinkStatus::new();
        let generation = status.generation();
        assert!(status.set_for(generation, TransportState::Connecting));

        status.retire();
        assert_eq!(*status.state.borrow(), TransportState::Disconnected);
        // 旧会话的 ConnAck 迟到
        assert!(!status.set_for(generation, TransportState::Connected));
        assert_eq!(*status.state.borrow(), TransportState::Disconnected);

        let next = status.generation();
        assert_ne!(next, generation);
        assert!(status.set_for(next, TransportState::Connecting));
        assert_eq!(*status.state.borrow(), TransportState::Connecting);
    }

    #[test]
    fn unchanged_state_is_not_a_change() {
        let status = LinkStatus::new();
        let generation = status.generation();
        assert!(!status.set_for(generation, TransportState::Disconnected));
    }

    #[test]
    fn qos_falls_back_to_at_most_once() {
        assert_eq!(qos_from_u8(1), QoS::AtLeastOnce);
        assert_eq!(qos_from_u8(9), QoS::AtMostOnce);
    }
}
