//! 端点配置持久化（JSON 文件）。

use crate::ConfigError;
use domain::EndpointConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 端点配置存储抽象。
pub trait EndpointStore: Send + Sync {
    /// 读取最近一次保存的配置；不存在或不可读时返回空配置，从不失败。
    fn load(&self) -> EndpointConfig;

    /// 原样保存（不裁剪、不规范化）。
    fn save(&self, config: &EndpointConfig) -> Result<(), ConfigError>;
}

/// 基于 JSON 文件的端点配置存储。
#[derive(Debug, Clone)]
pub struct JsonEndpointStore {
    path: PathBuf,
}

impl JsonEndpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<EndpointConfig>, ConfigError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ConfigError::Io(err)),
        };
        let config = serde_json::from_slice(&data).map_err(|err| ConfigError::Format(err.to_string()))?;
        Ok(Some(config))
    }
}

impl EndpointStore for JsonEndpointStore {
    fn load(&self) -> EndpointConfig {
        match self.read() {
            Ok(Some(config)) => config,
            Ok(None) => {
                info!(target: "pyro.config", path = %self.path.display(), "endpoint_config_absent");
                EndpointConfig::default()
            }
            Err(err) => {
                warn!(
                    target: "pyro.config",
                    path = %self.path.display(),
                    error = %err,
                    "endpoint_config_unreadable"
                );
                EndpointConfig::default()
            }
        }
    }

    fn save(&self, config: &EndpointConfig) -> Result<(), ConfigError> {
        let data =
            serde_json::to_vec_pretty(config).map_err(|err| ConfigError::Format(err.to_string()))?;
        std::fs::write(&self.path, data)?;
        info!(
            target: "pyro.config",
            path = %self.path.display(),
            plant_id = %config.plant_id,
            com_port = %config.com_port,
            "endpoint_config_saved"
        );
        Ok(())
    }
}
