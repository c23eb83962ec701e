//! 结构化日志模块
//!
//! 提供基于 tracing 的结构化日志功能。

use std::sync::Arc;

use parking_lot::RwLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LogOptions;
use crate::error::{ObservabilityError, Result};

/// 日志级别重新加载句柄类型
type ReloadHandle = Handle<EnvFilter, Registry>;

/// 日志管理器
///
/// 持有文件写入线程的 guard，drop 时刷新剩余日志。
pub struct LogManager {
    /// 配置
    options: LogOptions,

    /// 过滤器重新加载句柄
    reload_handle: Arc<RwLock<ReloadHandle>>,

    /// 非阻塞文件写入 guard
    _guard: Option<WorkerGuard>,
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("options", &self.options)
            .finish()
    }
}

impl LogManager {
    /// 初始化全局日志系统
    pub fn init(options: LogOptions) -> Result<Self> {
        let filter = build_filter(&options)?;
        let (filter, reload_handle) = reload::Layer::new(filter);

        let (writer, guard) = match &options.file_path {
            Some(path) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| std::path::PathBuf::from("."));
                let file_name = path
                    .file_name()
                    .ok_or_else(|| ObservabilityError::config(format!("Invalid log file: {:?}", path)))?;
                std::fs::create_dir_all(&dir)?;
                let appender = tracing_appender::rolling::never(&dir, file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (writer, Some(guard))
            }
            None => {
                let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
                (writer, Some(guard))
            }
        };

        let ansi = options.ansi_colors && options.file_path.is_none();
        let fmt_layer = if options.json_format {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(options.include_target)
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(options.include_target)
                .with_writer(writer)
                .with_ansi(ansi)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| ObservabilityError::logging(format!("Failed to install subscriber: {}", e)))?;

        tracing::info!(
            target: "ragchat_observability",
            "Log manager initialized with level: {}",
            options.level
        );

        Ok(Self {
            options,
            reload_handle: Arc::new(RwLock::new(reload_handle)),
            _guard: guard,
        })
    }

    /// 动态更新日志级别
    pub fn update_level(&mut self, level: &str) -> Result<()> {
        let new_filter = EnvFilter::try_new(level)
            .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e)))?;

        self.reload_handle
            .write()
            .modify(|filter| *filter = new_filter)
            .map_err(|e| ObservabilityError::logging(format!("Failed to update log level: {}", e)))?;
        self.options.level = level.to_string();

        tracing::info!(
            target: "ragchat_observability",
            "Log level updated to: {}",
            level
        );
        Ok(())
    }

    /// 获取当前配置
    pub fn options(&self) -> &LogOptions {
        &self.options
    }
}

/// 构建环境过滤器，RUST_LOG 存在时优先
fn build_filter(options: &LogOptions) -> Result<EnvFilter> {
    let mut filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&options.level),
    }
    .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e)))?;

    // 添加模块级别的过滤器
    for (module, level) in &options.module_levels {
        filter = filter.add_directive(
            format!("{}={}", module, level)
                .parse()
                .map_err(|e| ObservabilityError::logging(format!("Invalid directive: {}", e)))?,
        );
    }

    Ok(filter)
}

/// 创建带有会话上下文的 span
pub fn create_session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("session", session_id = %session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_rejects_bad_directive() {
        let options = LogOptions::default().with_module_level("ragchat", "loud");
        assert!(build_filter(&options).is_err());
    }

    #[test]
    fn test_build_filter_accepts_levels() {
        let options = LogOptions::default()
            .with_log_level("debug")
            .with_module_level("hyper", "warn");
        assert!(build_filter(&options).is_ok());
    }

    #[test]
    fn test_log_manager_init_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("ragchat.log");
        let options = LogOptions::default()
            .with_log_level("info")
            .with_log_file(&path);

        let mut manager = LogManager::init(options).unwrap();
        tracing::info!("hello from the test");

        manager.update_level("debug").unwrap();
        assert_eq!(manager.options().level, "debug");
        assert!(manager.update_level("ragchat=loud").is_err());
        drop(manager);

        assert!(path.exists());
    }
}
