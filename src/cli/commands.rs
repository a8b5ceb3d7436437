//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat, ValueType};
use crate::config::ConfigStore;
use crate::error::{ConfigError, Result};
use crate::logging::LoggingSystem;
use serde::Serialize;
use std::collections::BTreeMap;

/// 命令执行上下文
pub struct CommandContext<'a> {
    /// 命令操作的属性存储
    pub store: &'a ConfigStore,
    /// 日志系统，用于审计日志
    pub logging: &'a LoggingSystem,
}

impl CommandContext<'_> {
    /// 属性文件路径的显示文本
    fn target(&self) -> String {
        self.store
            .default_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }

    /// 保存属性并记录审计日志
    ///
    /// 默认属性文件存在但加载失败时拒绝保存，避免用部分内容覆盖它。
    fn save(&self, operation: &str, details: &str) -> Result<()> {
        let target = self.target();
        let saved = match self.store.default_load_error() {
            Some(reason) => Err(ConfigError::UnsafeOverwrite {
                path: target.clone(),
                reason: reason.to_string(),
            }),
            None => self.store.save_default(),
        };
        match saved {
            Ok(()) => {
                self.logging.audit_log(operation, &target, "ok", Some(details));
                Ok(())
            }
            Err(e) => {
                self.logging
                    .audit_log(operation, &target, "failed", Some(&e.to_string()));
                Err(e.into())
            }
        }
    }
}

/// 命令处理器trait
pub trait Command {
    /// 执行命令
    fn execute(&self, args: &Args, ctx: &CommandContext<'_>) -> Result<()>;
}

/// 执行CLI命令
///
/// 指定了 `--file` 时使用以该文件为默认路径的独立存储，否则使用全局存储。
/// 指定的文件存在但无法加载时直接返回错误。
pub fn run(args: &Args, logging: &LoggingSystem) -> Result<()> {
    match &args.file {
        Some(path) => {
            let store = ConfigStore::open(path)?;
            dispatch(args, &CommandContext { store: &store, logging })
        }
        None => dispatch(
            args,
            &CommandContext {
                store: ConfigStore::instance(),
                logging,
            },
        ),
    }
}

fn dispatch(args: &Args, ctx: &CommandContext<'_>) -> Result<()> {
    match &args.command {
        Commands::Get { .. } => GetCommand.execute(args, ctx),
        Commands::Set { .. } => SetCommand.execute(args, ctx),
        Commands::Remove { .. } => RemoveCommand.execute(args, ctx),
        Commands::List { .. } => ListCommand.execute(args, ctx),
        Commands::Check { .. } => CheckCommand.execute(args, ctx),
        Commands::Clear => ClearCommand.execute(args, ctx),
        Commands::Version { .. } => VersionCommand.execute(args, ctx),
    }
}

/// 读取命令
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, args: &Args, ctx: &CommandContext<'_>) -> Result<()> {
        if let Commands::Get {
            key,
            default,
            value_type,
        } = &args.command
        {
            let value = self.read_value(ctx.store, key, default.as_deref(), value_type)?;
            println!("{value}");
        }
        Ok(())
    }
}

impl GetCommand {
    /// 按类型读取属性值并格式化为文本
    fn read_value(
        &self,
        store: &ConfigStore,
        key: &str,
        default: Option<&str>,
        value_type: &ValueType,
    ) -> Result<String> {
        let value = match value_type {
            ValueType::String => match default {
                Some(default) => store.get_or_default(key, default),
                None => {
                    store.check_mandatory(key)?;
                    store.get(key).unwrap_or_default()
                }
            },
            ValueType::Int => {
                let default = default.map(str::parse::<i32>).transpose().map_err(|e| {
                    anyhow::anyhow!("默认值不是合法的整数: {}", e)
                })?;
                store.get_int_or_default(key, default.unwrap_or(0))?.to_string()
            }
            ValueType::Long => {
                let default = default.map(str::parse::<i64>).transpose().map_err(|e| {
                    anyhow::anyhow!("默认值不是合法的长整数: {}", e)
                })?;
                store.get_long_or_default(key, default.unwrap_or(0))?.to_string()
            }
            ValueType::Bool => {
                let default = default.is_some_and(|d| d.eq_ignore_ascii_case("true"));
                store.get_bool_or_default(key, default).to_string()
            }
        };
        Ok(value)
    }
}

/// 设置命令
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, args: &Args, ctx: &CommandContext<'_>) -> Result<()> {
        if let Commands::Set { expressions } = &args.command {
            // 先校验全部表达式，避免只写入一部分
            if let Some(bad) = expressions.iter().find(|expr| !expr.contains('=')) {
                return Err(ConfigError::InvalidExpression(bad.clone()).into());
            }
            for expr in expressions {
                ctx.store.set_from_expression(expr)?;
            }
            ctx.save("set", &expressions.join(" "))?;

            if args.is_verbose() {
                println!("已设置 {} 个属性: {}", expressions.len(), ctx.target());
            }
        }
        Ok(())
    }
}

/// 删除命令
pub struct RemoveCommand;

impl Command for RemoveCommand {
    fn execute(&self, args: &Args, ctx: &CommandContext<'_>) -> Result<()> {
        if let Commands::Remove { keys } = &args.command {
            for key in keys {
                if !ctx.store.exists(key) && args.is_verbose() {
                    eprintln!("属性不存在: {key}");
                }
                ctx.store.remove(key);
            }
            ctx.save("remove", &keys.join(" "))?;
        }
        Ok(())
    }
}

/// 属性列表输出
#[derive(Debug, Serialize)]
struct PropertyListing<'a> {
    /// 属性文件路径
    file: Option<String>,
    /// 属性数量
    count: usize,
    /// 全部属性
    properties: &'a BTreeMap<String, String>,
}

/// 列表命令
pub struct ListCommand;

impl Command for ListCommand {
    fn execute(&self, args: &Args, ctx: &CommandContext<'_>) -> Result<()> {
        if let Commands::List { format } = &args.command {
            let snapshot = ctx.store.snapshot();
            match format {
                OutputFormat::Json => {
                    let listing = PropertyListing {
                        file: ctx.store.default_path().map(|p| p.display().to_string()),
                        count: snapshot.len(),
                        properties: &snapshot,
                    };
                    println!("{}", serde_json::to_string_pretty(&listing)?);
                }
                OutputFormat::Text => {
                    if args.is_verbose() {
                        println!("# {} ({} 个属性)", ctx.target(), snapshot.len());
                    }
                    for (key, value) in &snapshot {
                        println!("{key}={value}");
                    }
                }
            }
        }
        Ok(())
    }
}

/// 必需属性检查命令
pub struct CheckCommand;

impl Command for CheckCommand {
    fn execute(&self, args: &Args, ctx: &CommandContext<'_>) -> Result<()> {
        if let Commands::Check { keys } = &args.command {
            let missing: Vec<&String> = keys
                .iter()
                .filter(|key| ctx.store.check_mandatory(key).is_err())
                .collect();

            if let Some(first) = missing.first() {
                for key in &missing {
                    eprintln!("✗ 缺少必需属性: {key}");
                }
                return Err(ConfigError::MissingMandatory {
                    key: first.to_string(),
                }
                .into());
            }

            println!("✓ {} 个必需属性均已配置", keys.len());
        }
        Ok(())
    }
}

/// 清空命令
pub struct ClearCommand;

impl Command for ClearCommand {
    fn execute(&self, args: &Args, ctx: &CommandContext<'_>) -> Result<()> {
        if let Commands::Clear = &args.command {
            let count = ctx.store.len();
            ctx.store.clear();
            ctx.save("clear", &format!("{count} entries"))?;

            if args.is_verbose() {
                println!("已清空 {} 个属性: {}", count, ctx.target());
            }
        }
        Ok(())
    }
}

/// 版本命令
pub struct VersionCommand;

impl Command for VersionCommand {
    fn execute(&self, args: &Args, _ctx: &CommandContext<'_>) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PropStoreError;
    use crate::logging::LogConfig;
    use clap::Parser;
    use std::path::Path;
    use tempfile::tempdir;

    fn logging() -> LoggingSystem {
        LoggingSystem::new(LogConfig::default())
    }

    fn run_with_file(file: &Path, command: &[&str]) -> Result<()> {
        let mut argv = vec!["propstore", "--file", file.to_str().unwrap()];
        argv.extend_from_slice(command);
        let args = Args::try_parse_from(argv).unwrap();
        run(&args, &logging())
    }

    #[test]
    fn test_set_command_persists_to_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.properties");

        run_with_file(&file, &["set", "font.size=12", "title=a=b"]).unwrap();

        let store = ConfigStore::with_default_path(&file);
        assert_eq!(store.get("font.size").as_deref(), Some("12"));
        assert_eq!(store.get("title").as_deref(), Some("a=b"));
    }

    #[test]
    fn test_set_command_rejects_bad_expression_without_writing() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.properties");

        let result = run_with_file(&file, &["set", "ok=1", "broken"]);

        assert!(matches!(
            result,
            Err(PropStoreError::Config(ConfigError::InvalidExpression(_)))
        ));
        assert!(!file.exists());
    }

    #[test]
    fn test_set_command_leaves_unparsable_file_intact() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("signer.properties");
        let original = "keystore.file=/home/u/ks.p12\nbad=\\u12G4\n";
        std::fs::write(&file, original).unwrap();

        let result = run_with_file(&file, &["set", "a=1"]);

        assert!(matches!(
            result,
            Err(PropStoreError::Config(ConfigError::Parse { .. }))
        ));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), original);
    }

    #[test]
    fn test_save_refused_after_failed_default_load() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(".propstore");
        let original = "keystore.file=/home/u/ks.p12\nbad=\\u12\n";
        std::fs::write(&file, original).unwrap();

        let store = ConfigStore::with_default_path(&file);
        let logging = logging();
        let ctx = CommandContext {
            store: &store,
            logging: &logging,
        };
        let args = Args::try_parse_from(["propstore", "set", "a=1"]).unwrap();

        assert!(matches!(
            SetCommand.execute(&args, &ctx),
            Err(PropStoreError::Config(ConfigError::UnsafeOverwrite { .. }))
        ));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), original);
    }

    #[test]
    fn test_remove_and_clear_commands() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.properties");
        std::fs::write(&file, "a=1\nb=2\nc=3\n").unwrap();

        run_with_file(&file, &["remove", "a", "missing"]).unwrap();
        let store = ConfigStore::with_default_path(&file);
        assert_eq!(store.keys(), vec!["b".to_string(), "c".to_string()]);

        run_with_file(&file, &["clear"]).unwrap();
        let store = ConfigStore::with_default_path(&file);
        assert!(store.is_empty());
        assert!(file.exists());
    }

    #[test]
    fn test_check_command() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.properties");
        std::fs::write(&file, "present=1\n").unwrap();

        assert!(run_with_file(&file, &["check", "present"]).is_ok());
        assert!(matches!(
            run_with_file(&file, &["check", "present", "absent"]),
            Err(PropStoreError::Config(ConfigError::MissingMandatory { .. }))
        ));
    }

    #[test]
    fn test_get_command_typed_values() {
        let store = ConfigStore::with_default_path(Path::new("unused.properties"));
        store.set("size", "12");
        store.set("big", "9000000000");
        store.set("flag", "TRUE");
        store.set("broken", "x1");

        let get = GetCommand;
        assert_eq!(
            get.read_value(&store, "size", None, &ValueType::Int).unwrap(),
            "12"
        );
        assert_eq!(
            get.read_value(&store, "big", None, &ValueType::Long).unwrap(),
            "9000000000"
        );
        assert_eq!(
            get.read_value(&store, "flag", None, &ValueType::Bool).unwrap(),
            "true"
        );
        assert_eq!(
            get.read_value(&store, "absent", Some("5"), &ValueType::Int)
                .unwrap(),
            "5"
        );
        assert_eq!(
            get.read_value(&store, "absent", Some("fallback"), &ValueType::String)
                .unwrap(),
            "fallback"
        );
        assert!(get
            .read_value(&store, "broken", Some("5"), &ValueType::Int)
            .is_err());
        assert!(get
            .read_value(&store, "absent", None, &ValueType::String)
            .is_err());
    }

    #[test]
    fn test_list_and_version_commands() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.properties");
        std::fs::write(&file, "a=1\n").unwrap();

        assert!(run_with_file(&file, &["list", "--format", "json"]).is_ok());
        assert!(run_with_file(&file, &["list"]).is_ok());
        assert!(run_with_file(&file, &["version", "--format", "json"]).is_ok());
    }
}
