pub mod data;

pub use data::{Indicator, Snapshot};

use serde::{Deserialize, Serialize};

/// 现场端点：装置标识 + 物理串口。
///
/// 不做任何校验，空字符串合法，连接时才会失败。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub plant_id: String,
    pub com_port: String,
}

impl EndpointConfig {
    pub fn new(plant_id: impl Into<String>, com_port: impl Into<String>) -> Self {
        Self {
            plant_id: plant_id.into(),
            com_port: com_port.into(),
        }
    }
}

/// 现场链路状态。
///
/// 只有成功的 connect 才能进入 `Connected`；任何读失败或显式断开都回到 `Disconnected`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
}

/// 转发链路状态。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}
