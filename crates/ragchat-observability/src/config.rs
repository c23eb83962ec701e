//! 日志配置
//!
//! 从 ragchat-config 的 `LoggingConfig` 转换而来，可由命令行参数覆盖。

use std::collections::HashMap;
use std::path::PathBuf;

use ragchat_config::{expand_tilde, LoggingConfig};

/// 日志选项
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// 日志级别（trace, debug, info, warn, error），RUST_LOG 优先
    pub level: String,

    /// 是否使用 JSON 格式
    pub json_format: bool,

    /// 日志文件路径，None 表示输出到 stderr
    pub file_path: Option<PathBuf>,

    /// 模块级别的日志配置
    pub module_levels: HashMap<String, String>,

    /// 是否启用 ANSI 颜色（仅 stderr 输出时生效）
    pub ansi_colors: bool,

    /// 是否包含目标（target）
    pub include_target: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file_path: None,
            module_levels: HashMap::new(),
            ansi_colors: true,
            include_target: true,
        }
    }
}

impl LogOptions {
    /// 设置日志级别
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// 设置日志文件路径
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// 只输出到 stderr
    pub fn without_log_file(mut self) -> Self {
        self.file_path = None;
        self
    }

    /// 添加模块特定的日志级别
    pub fn with_module_level(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.module_levels.insert(module.into(), level.into());
        self
    }
}

impl From<&LoggingConfig> for LogOptions {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.as_str().to_string(),
            json_format: config.json_format,
            file_path: config.file.as_deref().and_then(expand_tilde),
            ..Self::default()
        }
    }
}
