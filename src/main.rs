//! propstore 主程序入口
//!
//! 键值属性文件管理工具

use anyhow::{Context, Result};
use propstore::cli::{self, Args};
use propstore::logging::LoggingSystem;
use tracing::{debug, error};

fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse_args();

    // 初始化日志系统
    let logging_system =
        LoggingSystem::setup_logging(args.log_config()).context("初始化日志系统失败")?;

    debug!("propstore v{} 启动", propstore::VERSION);

    // 执行命令
    if let Err(e) = cli::run(&args, &logging_system) {
        error!("命令执行失败: {}", e);
        eprintln!("错误: {e}");
        std::process::exit(1);
    }

    Ok(())
}
