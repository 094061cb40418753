//! 协议错误类型定义

/// 协议通信错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 连接错误
    #[error("connection error: {0}")]
    Connection(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Modbus 错误
    #[error("modbus error: {0}")]
    Modbus(String),

    /// 设备异常应答（NAK）
    #[error("device exception: code {0:#04x}")]
    Exception(u8),

    /// 帧格式错误
    #[error("frame error: {0}")]
    Frame(String),

    /// 配置解析错误
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// 数据解析错误
    #[error("data parse error: {0}")]
    DataParse(String),

    /// 超时错误
    #[error("timeout: {0}")]
    Timeout(String),
}

/// 现场链路错误
#[derive(Debug, thiserror::Error)]
pub enum FieldLinkError {
    /// 打开链路失败，链路保持断开
    #[error("field link connect failed: {0}")]
    Connect(ProtocolError),

    /// 未连接时读取
    #[error("field link not connected")]
    NotConnected,

    /// 读取失败，链路已被置为断开
    #[error("field link read failed: {0}")]
    Read(ProtocolError),
}
