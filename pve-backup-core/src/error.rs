use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProbeError>;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("配置文件解析错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("HTTP 请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("配置文件未找到: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("配置项缺失: {0}")]
    MissingSetting(String),

    #[error("备份计划无效: {0}")]
    Schedule(String),

    #[error("存储配置无效: {0}")]
    Storage(String),

    #[error("认证失败: {0}")]
    Auth(String),

    #[error("API请求失败: {0}")]
    Api(String),
}

impl ProbeError {
    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingSetting(msg.into())
    }
}
