//! 现场设备抽象

use crate::error::ProtocolError;
use async_trait::async_trait;
use domain::EndpointConfig;

/// 已打开的现场设备（一次只服务一个请求）。
#[async_trait]
pub trait FieldDevice: Send {
    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError>;
}

/// 按端点打开现场设备。
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn open(&self, endpoint: &EndpointConfig) -> Result<Box<dyn FieldDevice>, ProtocolError>;
}
