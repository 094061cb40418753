//! Modbus TCP 接入（经串口服务器）
//!
//! `comPort` 写作 `host:port`，省略端口时使用 502。

use crate::device::{DeviceConnector, FieldDevice};
use crate::error::ProtocolError;
use async_trait::async_trait;
use domain::EndpointConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::prelude::*;
use tracing::{debug, info};

/// Modbus TCP 配置
#[derive(Debug, Clone)]
pub struct ModbusTcpConfig {
    /// 缺省端口
    pub default_port: u16,
    /// 从站 ID
    pub slave_id: u8,
    /// 连接超时
    pub connect_timeout: Duration,
    /// 读取超时
    pub read_timeout: Duration,
}

impl Default for ModbusTcpConfig {
    fn default() -> Self {
        Self {
            default_port: 502,
            slave_id: 1,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
        }
    }
}

/// Modbus TCP 连接器
#[derive(Debug, Clone, Default)]
pub struct ModbusTcpConnector {
    config: ModbusTcpConfig,
}

impl ModbusTcpConnector {
    pub fn new(config: ModbusTcpConfig) -> Self {
        Self { config }
    }

    /// 端点地址补全端口
    fn address_for(&self, endpoint: &EndpointConfig) -> Result<String, ProtocolError> {
        let address = endpoint.com_port.trim();
        if address.is_empty() {
            return Err(ProtocolError::ConfigParse("gateway address is empty".to_string()));
        }
        if address.rsplit_once(':').is_some_and(|(_, port)| port.parse::<u16>().is_ok()) {
            Ok(address.to_string())
        } else {
            Ok(format!("{}:{}", address, self.config.default_port))
        }
    }

    async fn resolve(&self, address: &str) -> Result<SocketAddr, ProtocolError> {
        tokio::net::lookup_host(address)
            .await
            .map_err(|e| ProtocolError::ConfigParse(format!("invalid address {}: {}", address, e)))?
            .next()
            .ok_or_else(|| ProtocolError::ConfigParse(format!("unresolved address {}", address)))
    }
}

#[async_trait]
impl DeviceConnector for ModbusTcpConnector {
    async fn open(&self, endpoint: &EndpointConfig) -> Result<Box<dyn FieldDevice>, ProtocolError> {
        let address = self.address_for(endpoint)?;
        let addr = self.resolve(&address).await?;

        info!(target: "pyro.field", "connecting to modbus gateway at {}", addr);
        let ctx = timeout(
            self.config.connect_timeout,
            tcp::connect_slave(addr, Slave(self.config.slave_id)),
        )
        .await
        .map_err(|_| ProtocolError::Timeout(format!("connect to {}", addr)))?
        .map_err(|e| ProtocolError::Connection(e.to_string()))?;
        info!(target: "pyro.field", plant_id = %endpoint.plant_id, "connected to modbus gateway at {}", addr);

        Ok(Box::new(ModbusTcpDevice {
            ctx,
            slave_id: self.config.slave_id,
            read_timeout: self.config.read_timeout,
        }))
    }
}

/// 已连接的 Modbus TCP 设备
struct ModbusTcpDevice {
    ctx: tokio_modbus::client::Context,
    slave_id: u8,
    read_timeout: Duration,
}

#[async_trait]
impl FieldDevice for ModbusTcpDevice {
    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        let registers = timeout(self.read_timeout, self.ctx.read_holding_registers(start, count))
            .await
            .map_err(|_| ProtocolError::Timeout(format!("read registers {}+{}", start, count)))?
            .map_err(|e| ProtocolError::Modbus(e.to_string()))?
            .map_err(|e| ProtocolError::Modbus(format!("exception: {:?}", e)))?;

        debug!(
            target: "pyro.field",
            slave = self.slave_id,
            register = start,
            count = count,
            values = ?registers,
            "read modbus registers"
        );
        Ok(registers)
    }
}
