//! 应用运行配置与端点配置存储。

mod store;

pub use store::{EndpointStore, JsonEndpointStore};

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config format error: {0}")]
    Format(String),
}

/// 现场链路接入方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldProtocol {
    /// Modbus ASCII，直连串口
    Serial,
    /// Modbus TCP，经串口服务器，`comPort` 为 `host:port`
    Tcp,
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_path: PathBuf,
    pub boiler_id: u32,
    pub field_protocol: FieldProtocol,
    pub field_baud_rate: u32,
    pub field_slave_id: u8,
    pub field_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic_prefix: String,
    pub mqtt_qos: u8,
    pub publish_channel: String,
    pub transport_auto_reconnect: bool,
    pub transport_reconnect_ms: u64,
    pub auto_connect: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_path =
            PathBuf::from(env::var("PYRO_CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string()));
        let boiler_id = read_u32_with_default("PYRO_BOILER_ID", 0)?;
        let field_protocol = read_field_protocol("PYRO_FIELD_PROTOCOL")?;
        let field_baud_rate = read_u32_with_default("PYRO_FIELD_BAUD_RATE", 9600)?;
        let field_slave_id = read_u8_with_default("PYRO_FIELD_SLAVE_ID", 1)?;
        let field_timeout_ms = read_u64_with_default("PYRO_FIELD_TIMEOUT_MS", 10_000)?;
        let poll_interval_ms = read_u64_with_default("PYRO_POLL_INTERVAL_MS", 2000)?;
        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "PYRO_POLL_INTERVAL_MS".to_string(),
                "0".to_string(),
            ));
        }
        let mqtt_host = env::var("PYRO_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("PYRO_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("PYRO_MQTT_USERNAME");
        let mqtt_password = read_optional("PYRO_MQTT_PASSWORD");
        let mqtt_topic_prefix = env::var("PYRO_MQTT_TOPIC_PREFIX").unwrap_or_default();
        let mqtt_qos = read_u8_with_default("PYRO_MQTT_QOS", 0)?;
        let publish_channel = read_optional("PYRO_PUBLISH_CHANNEL").unwrap_or_else(|| "realtime".to_string());
        let transport_auto_reconnect = read_bool_with_default("PYRO_TRANSPORT_AUTO_RECONNECT", true);
        let transport_reconnect_ms = read_u64_with_default("PYRO_TRANSPORT_RECONNECT_MS", 5000)?;
        let auto_connect = read_bool_with_default("PYRO_AUTO_CONNECT", false);

        Ok(Self {
            config_path,
            boiler_id,
            field_protocol,
            field_baud_rate,
            field_slave_id,
            field_timeout_ms,
            poll_interval_ms,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_prefix,
            mqtt_qos,
            publish_channel,
            transport_auto_reconnect,
            transport_reconnect_ms,
            auto_connect,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn field_timeout(&self) -> Duration {
        Duration::from_millis(self.field_timeout_ms)
    }

    pub fn transport_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.transport_reconnect_ms)
    }
}

fn read_field_protocol(key: &str) -> Result<FieldProtocol, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(FieldProtocol::Serial),
    };
    parse_field_protocol(&value).ok_or_else(|| ConfigError::Invalid(key.to_string(), value))
}

fn parse_field_protocol(value: &str) -> Option<FieldProtocol> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "serial" | "ascii" => Some(FieldProtocol::Serial),
        "tcp" => Some(FieldProtocol::Tcp),
        _ => None,
    }
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
