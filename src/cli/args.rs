//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::logging::LogConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// propstore - 键值属性文件管理工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "propstore",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 属性文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "属性文件路径（默认为用户主目录下的 .propstore）",
        env = "PROPSTORE_FILE"
    )]
    pub file: Option<PathBuf>,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "warn",
        help = "日志级别",
        env = "PROPSTORE_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 日志文件路径
    #[arg(
        long,
        value_name = "FILE",
        help = "日志写入文件（追加），不再输出到标准错误",
        env = "PROPSTORE_LOG_FILE"
    )]
    pub log_file: Option<PathBuf>,

    /// 日志格式
    #[arg(
        long,
        value_enum,
        default_value = "text",
        help = "日志格式",
        env = "PROPSTORE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// 是否启用详细输出
    #[arg(short, long, help = "启用详细输出")]
    pub verbose: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 日志格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 读取属性
    Get {
        /// 属性名
        #[arg(value_name = "KEY", help = "属性名")]
        key: String,

        /// 属性不存在时的默认值
        #[arg(short, long, value_name = "VALUE", help = "属性不存在时的默认值")]
        default: Option<String>,

        /// 按指定类型解析属性值
        #[arg(
            short = 't',
            long = "type",
            value_enum,
            default_value = "string",
            help = "值类型"
        )]
        value_type: ValueType,
    },

    /// 设置属性并保存
    Set {
        /// key=value 表达式
        #[arg(value_name = "KEY=VALUE", required = true, help = "key=value 表达式")]
        expressions: Vec<String>,
    },

    /// 删除属性并保存
    Remove {
        /// 属性名
        #[arg(value_name = "KEY", required = true, help = "属性名")]
        keys: Vec<String>,
    },

    /// 列出所有属性
    List {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 检查必需属性是否存在
    Check {
        /// 必需的属性名
        #[arg(value_name = "KEY", required = true, help = "必需的属性名")]
        keys: Vec<String>,
    },

    /// 清空所有属性并保存
    Clear,

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

/// 属性值类型
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum ValueType {
    /// 原始字符串
    String,
    /// 32位整数
    Int,
    /// 64位整数
    Long,
    /// 布尔值
    Bool,
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 是否启用详细输出
    pub fn is_verbose(&self) -> bool {
        self.verbose || matches!(self.log_level, LogLevel::Debug)
    }

    /// 根据参数构造日志配置
    ///
    /// 指定日志文件时只写文件，否则输出到标准错误。
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone().into(),
            file_path: self.log_file.clone(),
            console: self.log_file.is_none(),
            json_format: self.log_format == LogFormat::Json,
        }
    }
}
