//! propstore - 进程级键值属性存储
//!
//! 这是一个用Rust编写的属性配置库，支持：
//! - 从文件、输入流或用户主目录下的默认文件加载属性
//! - 字符串、整数、长整数、布尔类型的读取与默认值
//! - 必需属性检查
//! - 多线程并发安全的读写、清空与保存
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

// 重新导出主要类型
pub use config::ConfigStore;
pub use error::{ConfigError, PropStoreError};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
