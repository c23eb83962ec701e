//! ragchat observability
//!
//! 基于 tracing 的日志初始化，供 TUI 和 CLI 共用。

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::LogOptions;
pub use error::{ObservabilityError, Result};
pub use logging::{create_session_span, LogManager};
