//! 串口 Modbus ASCII 接入
//!
//! 现场 PLC 使用 Modbus ASCII，默认 9600 波特、7 数据位、偶校验、1 停止位。

use crate::ascii::AsciiClient;
use crate::device::{DeviceConnector, FieldDevice};
use crate::error::ProtocolError;
use async_trait::async_trait;
use domain::EndpointConfig;
use std::time::Duration;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, StopBits};
use tracing::{debug, info};

/// 串口参数
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// 从站 ID (1-247)
    pub slave_id: u8,
    /// 单次请求超时
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            stop_bits: StopBits::One,
            slave_id: 1,
            timeout: Duration::from_secs(10),
        }
    }
}

/// 按 `comPort` 打开串口的连接器
#[derive(Debug, Clone, Default)]
pub struct SerialAsciiConnector {
    config: SerialConfig,
}

impl SerialAsciiConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DeviceConnector for SerialAsciiConnector {
    async fn open(&self, endpoint: &EndpointConfig) -> Result<Box<dyn FieldDevice>, ProtocolError> {
        let port = endpoint.com_port.as_str();
        if port.trim().is_empty() {
            return Err(ProtocolError::Connection("com port is empty".to_string()));
        }

        debug!(
            target: "pyro.field",
            port = %port,
            baud_rate = self.config.baud_rate,
            slave = self.config.slave_id,
            "opening serial port"
        );
        let stream = tokio_serial::new(port, self.config.baud_rate)
            .data_bits(self.config.data_bits)
            .parity(self.config.parity)
            .stop_bits(self.config.stop_bits)
            .timeout(self.config.timeout)
            .open_native_async()
            .map_err(|e| ProtocolError::Connection(format!("open {}: {}", port, e)))?;

        info!(target: "pyro.field", port = %port, plant_id = %endpoint.plant_id, "serial port opened (ascii 7E1)");
        Ok(Box::new(AsciiClient::new(
            stream,
            self.config.slave_id,
            self.config.timeout,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_line_settings() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Seven);
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.slave_id, 1);
    }

    #[tokio::test]
    async fn test_empty_port_fails_to_open() {
        let connector = SerialAsciiConnector::default();
        let result = connector.open(&EndpointConfig::new("Plant-7", "")).await;
        assert!(matches!(result, Err(ProtocolError::Connection(_))));
    }
}
