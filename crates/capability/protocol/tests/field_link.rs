use async_trait::async_trait;
use domain::{EndpointConfig, Indicator, LinkState};
use pyro_protocol::{DeviceConnector, FieldDevice, FieldLink, FieldLinkError, ProtocolError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct Script {
    opens: AtomicUsize,
    reads: AtomicUsize,
    refuse_open: AtomicBool,
    fail_reads: AtomicBool,
}

struct ScriptedDevice {
    script: Arc<Script>,
}

#[async_trait]
impl FieldDevice for ScriptedDevice {
    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        self.script.reads.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_reads.load(Ordering::SeqCst) {
            return Err(ProtocolError::Timeout("scripted".to_string()));
        }
        // 每个寄存器值 = 相对 4466 的偏移，指示量区全部置 1
        Ok((start..start + count)
            .map(|address| {
                let offset = address - 4466;
                if (11..=16).contains(&offset) { 1 } else { offset }
            })
            .collect())
    }
}

struct ScriptedConnector {
    script: Arc<Script>,
}

#[async_trait]
impl DeviceConnector for ScriptedConnector {
    async fn open(&self, _endpoint: &EndpointConfig) -> Result<Box<dyn FieldDevice>, ProtocolError> {
        self.script.opens.fetch_add(1, Ordering::SeqCst);
        if self.script.refuse_open.load(Ordering::SeqCst) {
            return Err(ProtocolError::Connection("port busy".to_string()));
        }
        Ok(Box::new(ScriptedDevice {
            script: self.script.clone(),
        }))
    }
}

fn link(script: &Arc<Script>) -> FieldLink {
    FieldLink::new(
        Arc::new(ScriptedConnector {
            script: script.clone(),
        }),
        0,
    )
}

#[tokio::test]
async fn connect_records_endpoint_and_reads_snapshot() {
    let script = Arc::new(Script::default());
    let mut link = link(&script);
    assert_eq!(link.state(), LinkState::Disconnected);

    assert!(link.connect("Plant-7", "COM9").await.expect("connect"));
    assert_eq!(link.state(), LinkState::Connected);
    assert_eq!(link.endpoint(), Some(&EndpointConfig::new("Plant-7", "COM9")));

    let snapshot = link.read_snapshot().await.expect("snapshot");
    assert_eq!(script.reads.load(Ordering::SeqCst), 3);
    assert_eq!(snapshot.id, 0);
    assert_eq!(snapshot.separator_temp, 1.0);
    assert_eq!(snapshot.gas_tank_pressure, 6.0);
    assert_eq!(snapshot.cooling_end_time, 10);
    assert_eq!(snapshot.nitrogen_purging, Indicator::Nominal);
    assert_eq!(snapshot.auto_shut_down, Indicator::Alarm);
}

#[tokio::test]
async fn connect_while_connected_keeps_endpoint() {
    let script = Arc::new(Script::default());
    let mut link = link(&script);
    link.connect("Plant-7", "COM9").await.expect("connect");

    assert!(link.connect("Plant-8", "COM1").await.expect("second connect"));
    assert_eq!(script.opens.load(Ordering::SeqCst), 1);
    assert_eq!(link.endpoint(), Some(&EndpointConfig::new("Plant-7", "COM9")));
}

#[tokio::test]
async fn failed_connect_stays_disconnected() {
    let script = Arc::new(Script::default());
    script.refuse_open.store(true, Ordering::SeqCst);
    let mut link = link(&script);

    let err = link.connect("Plant-7", "COM9").await.unwrap_err();
    assert!(matches!(err, FieldLinkError::Connect(ProtocolError::Connection(_))));
    assert!(!link.is_connected());
    assert!(link.endpoint().is_none());
}

#[tokio::test]
async fn read_failure_disconnects_the_link() {
    let script = Arc::new(Script::default());
    let mut link = link(&script);
    link.connect("Plant-7", "COM9").await.expect("connect");

    script.fail_reads.store(true, Ordering::SeqCst);
    let err = link.read_snapshot().await.unwrap_err();
    assert!(matches!(err, FieldLinkError::Read(ProtocolError::Timeout(_))));
    assert_eq!(link.state(), LinkState::Disconnected);
    // 一次失败即放弃，不在读内重试
    assert_eq!(script.reads.load(Ordering::SeqCst), 1);

    let err = link.read_snapshot().await.unwrap_err();
    assert!(matches!(err, FieldLinkError::NotConnected));
    assert_eq!(script.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn explicit_disconnect_allows_reconnect_with_new_endpoint() {
    let script = Arc::new(Script::default());
    let mut link = link(&script);
    link.connect("Plant-7", "COM9").await.expect("connect");

    assert!(link.disconnect());
    assert!(!link.disconnect());
    assert!(!link.is_connected());

    link.connect("Plant-8", "COM1").await.expect("reconnect");
    assert_eq!(link.endpoint(), Some(&EndpointConfig::new("Plant-8", "COM1")));
    assert_eq!(script.opens.load(Ordering::SeqCst), 2);
}
