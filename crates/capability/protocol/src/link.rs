//! 现场链路管理
//!
//! 状态机：`Disconnected --connect--> Connected --读失败 | disconnect--> Disconnected`。
//! 没有自动重连，需要操作员重新发起 connect。

use crate::device::{DeviceConnector, FieldDevice};
use crate::error::{FieldLinkError, ProtocolError};
use crate::types::{RegisterBlock, SNAPSHOT_BLOCKS, decode_snapshot, now_epoch_ms};
use domain::{EndpointConfig, LinkState, Snapshot};
use pyro_telemetry::{
    record_field_link_connect, record_field_link_connect_failure, record_read_failure,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 现场链路管理器
pub struct FieldLink {
    connector: Arc<dyn DeviceConnector>,
    device: Option<Box<dyn FieldDevice>>,
    endpoint: Option<EndpointConfig>,
    boiler_id: u32,
    blocks: Vec<RegisterBlock>,
}

impl FieldLink {
    pub fn new(connector: Arc<dyn DeviceConnector>, boiler_id: u32) -> Self {
        Self {
            connector,
            device: None,
            endpoint: None,
            boiler_id,
            blocks: SNAPSHOT_BLOCKS.to_vec(),
        }
    }

    pub fn state(&self) -> LinkState {
        if self.device.is_some() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    /// 当前连接的端点（断开时为空）
    pub fn endpoint(&self) -> Option<&EndpointConfig> {
        self.endpoint.as_ref()
    }

    /// 打开现场链路。
    ///
    /// 已连接时不做任何改变，直接返回当前状态；端点保持不变。
    pub async fn connect(&mut self, plant_id: &str, com_port: &str) -> Result<bool, FieldLinkError> {
        if self.is_connected() {
            debug!(
                target: "pyro.field",
                requested_port = %com_port,
                "field_link_connect_ignored_already_connected"
            );
            return Ok(true);
        }

        let endpoint = EndpointConfig::new(plant_id, com_port);
        match self.connector.open(&endpoint).await {
            Ok(device) => {
                record_field_link_connect();
                info!(
                    target: "pyro.field",
                    plant_id = %endpoint.plant_id,
                    com_port = %endpoint.com_port,
                    "field_link_connected"
                );
                self.device = Some(device);
                self.endpoint = Some(endpoint);
                Ok(true)
            }
            Err(err) => {
                record_field_link_connect_failure();
                warn!(
                    target: "pyro.field",
                    plant_id = %endpoint.plant_id,
                    com_port = %endpoint.com_port,
                    error = %err,
                    "field_link_connect_failed"
                );
                self.release();
                Err(FieldLinkError::Connect(err))
            }
        }
    }

    /// 显式断开；返回断开前是否已连接
    pub fn disconnect(&mut self) -> bool {
        let was_connected = self.is_connected();
        if was_connected {
            info!(
                target: "pyro.field",
                com_port = ?self.endpoint.as_ref().map(|e| e.com_port.as_str()),
                "field_link_disconnected"
            );
        }
        self.release();
        was_connected
    }

    /// 读取一份快照。
    ///
    /// 任何失败（超时、帧错误、设备 NAK）都会把链路置为断开。
    pub async fn read_snapshot(&mut self) -> Result<Snapshot, FieldLinkError> {
        let Some(device) = self.device.as_mut() else {
            return Err(FieldLinkError::NotConnected);
        };

        let result = match read_blocks(device, &self.blocks).await {
            Ok(registers) => decode_snapshot(self.boiler_id, &registers, now_epoch_ms()),
            Err(err) => Err(err),
        };

        match result {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                record_read_failure();
                warn!(
                    target: "pyro.field",
                    com_port = ?self.endpoint.as_ref().map(|e| e.com_port.as_str()),
                    error = %err,
                    "field_link_read_failed"
                );
                self.release();
                Err(FieldLinkError::Read(err))
            }
        }
    }

    fn release(&mut self) {
        self.device = None;
        self.endpoint = None;
    }
}

async fn read_blocks(
    device: &mut Box<dyn FieldDevice>,
    blocks: &[RegisterBlock],
) -> Result<Vec<u16>, ProtocolError> {
    let mut registers = Vec::with_capacity(blocks.iter().map(|b| b.count as usize).sum());
    for block in blocks {
        let values = device.read_holding_registers(block.start, block.count).await?;
        if values.len() != block.count as usize {
            return Err(ProtocolError::DataParse(format!(
                "block {}: expected {} registers, got {}",
                block.start,
                block.count,
                values.len()
            )));
        }
        registers.extend(values);
    }
    Ok(registers)
}
