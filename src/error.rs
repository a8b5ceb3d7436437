//! 错误处理模块
//!
//! 定义属性存储与命令行程序的统一错误类型

use std::num::ParseIntError;
use thiserror::Error;

/// propstore 命令行程序的主要错误类型
#[derive(Error, Debug)]
pub enum PropStoreError {
    /// 属性存储相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 属性存储错误类型
///
/// 所有加载、保存、表达式解析和必需属性检查的失败都归为这一种错误。
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 属性文件路径为空
    #[error("属性文件路径为空")]
    EmptyPath,

    /// 无法确定默认属性文件路径
    #[error("无法确定用户主目录，默认属性文件路径不可用")]
    NoDefaultPath,

    /// 属性文件不存在或不可读
    #[error("属性文件不存在或不可读: {path}")]
    FileNotReadable { path: String },

    /// 读取属性数据失败
    #[error("属性加载失败: {0}")]
    Load(#[source] std::io::Error),

    /// 属性文件格式错误
    #[error("属性文件解析失败(第{line}行): {message}")]
    Parse { line: usize, message: String },

    /// 保存属性文件失败
    #[error("属性保存失败: {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 属性文件存在但加载失败，保存会覆盖其中的属性
    #[error("属性文件加载失败，拒绝覆盖: {path}: {reason}")]
    UnsafeOverwrite { path: String, reason: String },

    /// key=value 表达式格式错误
    #[error("错误的属性表达式: {0:?}")]
    InvalidExpression(String),

    /// 缺少必需属性
    #[error("必需属性 '{key}' 不存在")]
    MissingMandatory { key: String },

    /// 数值属性格式错误
    #[error("属性 '{key}' 的值 {value:?} 不是合法的整数")]
    InvalidNumber {
        key: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, PropStoreError>;

/// 属性存储操作的结果类型别名
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
