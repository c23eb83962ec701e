pub mod config;
pub mod manager;

pub use config::{
    Config, ConfigError, ConfigResult, LogLevel, LoggingConfig, ServerConfig, StorageConfig,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 ragchat 配置目录路径
pub fn ragchat_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ragchat"))
}

/// 获取默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    ragchat_dir().map(|dir| dir.join("config.json"))
}

/// 获取默认日志文件路径
pub fn default_log_path() -> Option<PathBuf> {
    ragchat_dir().map(|dir| dir.join("logs").join("ragchat.log"))
}

/// 初始化 ragchat 目录结构
pub async fn init_ragchat_dirs() -> ConfigResult<()> {
    if let Some(dir) = ragchat_dir() {
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::create_dir_all(dir.join("logs")).await?;
    }
    Ok(())
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir().map(|home| home.join(rest))
    } else {
        Some(PathBuf::from(path))
    }
}
