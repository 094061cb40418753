//! # 现场链路能力模块
//!
//! 负责与现场 PLC 的连接、读取与快照解码：
//! - **Modbus ASCII**：直连串口（默认 9600 7E1，从站 1）
//! - **Modbus TCP**：经串口服务器接入，`comPort` 写作 `host:port`
//! - **FieldLink**：连接/断开/读取的生命周期与状态机
//!
//! ## 架构设计
//!
//! ```text
//! EndpointConfig (plantId + comPort)
//!       │
//!       ▼
//! FieldLink ──open──▶ DeviceConnector
//!       │                 ├── SerialAsciiConnector
//!       │                 └── ModbusTcpConnector
//!       ▼
//! FieldDevice.read_holding_registers × 3 块
//!       │
//!       ▼
//! decode_snapshot → domain::Snapshot
//! ```
//!
//! 读取任一失败即视为链路故障：设备句柄被释放，状态回到 `Disconnected`，不做读内重试。

mod ascii;
mod device;
mod error;
mod link;
mod modbus_tcp;
mod serial;
mod types;

pub use ascii::{AsciiClient, decode_frame, encode_frame, lrc, parse_read_response, read_holding_request};
pub use device::{DeviceConnector, FieldDevice};
pub use error::{FieldLinkError, ProtocolError};
pub use link::FieldLink;
pub use modbus_tcp::{ModbusTcpConfig, ModbusTcpConnector};
pub use serial::{SerialAsciiConnector, SerialConfig};
pub use types::*;
