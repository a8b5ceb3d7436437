//! 属性存储
//!
//! 提供线程安全的进程级键值属性存储。所有值以原始字符串保存，
//! 类型化读取在每次调用时重新解析。

use crate::config::format::serialize_properties;
use crate::config::loader::{get_default_property_path, read_properties, read_property_file};
use crate::error::{ConfigError, ConfigResult};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// 全局属性存储实例
static GLOBAL_STORE: OnceLock<ConfigStore> = OnceLock::new();

/// 线程安全的键值属性存储
///
/// 通过 [`ConfigStore::instance`] 获取进程级共享实例；测试或需要隔离的场景
/// 可以用 [`ConfigStore::new`] / [`ConfigStore::with_default_path`] 创建独立实例。
#[derive(Debug)]
pub struct ConfigStore {
    /// 属性表
    entries: RwLock<HashMap<String, String>>,
    /// 串行化文件写入
    io_lock: Mutex<()>,
    /// 默认属性文件路径
    default_path: Option<PathBuf>,
    /// 默认属性文件存在但隐式加载失败时的原因
    default_load_error: Option<String>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// 创建空的属性存储，默认路径为用户主目录下的默认属性文件，不加载任何内容
    pub fn new() -> Self {
        Self::with_path(get_default_property_path())
    }

    /// 以指定文件作为默认路径创建属性存储，并尝试加载该文件
    ///
    /// 加载失败会被忽略，存储保持为空，与全局实例的初始化行为一致。
    pub fn with_default_path<P: Into<PathBuf>>(path: P) -> Self {
        Self::with_path(Some(path.into())).load_default_quietly()
    }

    /// 以指定文件作为默认路径打开属性存储
    ///
    /// 文件不存在时得到空存储；文件存在但无法读取或解析时返回错误，
    /// 不会在之后的保存中覆盖它。
    ///
    /// # 参数
    /// * `path` - 属性文件路径
    ///
    /// # 返回
    /// * `ConfigResult<Self>` - 属性存储或加载错误
    pub fn open<P: Into<PathBuf>>(path: P) -> ConfigResult<Self> {
        let store = Self::with_path(Some(path.into()));
        if store.default_path.as_deref().is_some_and(Path::exists) {
            store.load_default()?;
        }
        Ok(store)
    }

    /// 获取全局属性存储
    ///
    /// 第一次调用时创建实例并尝试加载默认属性文件，默认文件不存在或无法解析时
    /// 以空存储继续。
    pub fn instance() -> &'static ConfigStore {
        GLOBAL_STORE.get_or_init(|| Self::new().load_default_quietly())
    }

    fn with_path(default_path: Option<PathBuf>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            io_lock: Mutex::new(()),
            default_path,
            default_load_error: None,
        }
    }

    fn load_default_quietly(mut self) -> Self {
        if let Err(e) = self.load_default() {
            let file_missing = !self.default_path.as_deref().is_some_and(Path::exists);
            if file_missing {
                // 默认文件不存在视为没有历史配置
                debug!("未加载默认属性文件: {}", e);
            } else {
                warn!("默认属性文件加载失败，以空存储继续: {}", e);
                self.default_load_error = Some(e.to_string());
            }
        }
        self
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 默认属性文件路径
    pub fn default_path(&self) -> Option<&Path> {
        self.default_path.as_deref()
    }

    /// 构造时默认属性文件存在但加载失败的原因
    ///
    /// 文件不存在不算失败。返回 `Some` 时保存到默认路径会丢失文件中原有的属性。
    pub fn default_load_error(&self) -> Option<&str> {
        self.default_load_error.as_deref()
    }

    /// 从文件加载属性
    ///
    /// 文件中的键覆盖已有的同名属性，文件中不存在的属性保持不变。
    /// 文件先完整解析再合并，解析失败时存储不会被修改。
    ///
    /// # 参数
    /// * `path` - 属性文件路径
    ///
    /// # 返回
    /// * `ConfigResult<()>` - 路径为空、文件不可读或格式错误时返回错误
    pub fn load_from_path<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let loaded = read_property_file(path.as_ref())?;
        self.merge(loaded);
        Ok(())
    }

    /// 从输入流加载属性，合并规则与 [`ConfigStore::load_from_path`] 相同
    pub fn load_from_reader<R: Read>(&self, reader: R) -> ConfigResult<()> {
        let loaded = read_properties(reader)?;
        self.merge(loaded);
        Ok(())
    }

    /// 从默认属性文件加载属性
    pub fn load_default(&self) -> ConfigResult<()> {
        let path = self.default_path.as_deref().ok_or(ConfigError::NoDefaultPath)?;
        self.load_from_path(path)
    }

    fn merge(&self, loaded: Vec<(String, String)>) {
        let count = loaded.len();
        let mut entries = self.write_entries();
        entries.extend(loaded);
        debug!("合并 {} 个属性，当前共 {} 个", count, entries.len());
    }

    /// 获取属性原始值
    pub fn get(&self, key: &str) -> Option<String> {
        self.read_entries().get(key).cloned()
    }

    /// 获取属性原始值，不存在时返回默认值
    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// 获取整数属性，不存在时返回 0
    ///
    /// 属性存在但不是合法整数时返回 [`ConfigError::InvalidNumber`]，不会回退到默认值。
    pub fn get_int(&self, key: &str) -> ConfigResult<i32> {
        self.get_int_or_default(key, 0)
    }

    /// 获取整数属性，不存在时返回 `default`
    pub fn get_int_or_default(&self, key: &str, default: i32) -> ConfigResult<i32> {
        self.get_number(key, default)
    }

    /// 获取长整数属性，不存在时返回 0
    pub fn get_long(&self, key: &str) -> ConfigResult<i64> {
        self.get_long_or_default(key, 0)
    }

    /// 获取长整数属性，不存在时返回 `default`
    pub fn get_long_or_default(&self, key: &str, default: i64) -> ConfigResult<i64> {
        self.get_number(key, default)
    }

    fn get_number<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr<Err = ParseIntError>,
    {
        let entries = self.read_entries();
        match entries.get(key) {
            Some(value) => value.parse().map_err(|source| ConfigError::InvalidNumber {
                key: key.to_string(),
                value: value.clone(),
                source,
            }),
            None => Ok(default),
        }
    }

    /// 获取布尔属性，不存在时返回 false
    ///
    /// 只有忽略大小写等于 `"true"` 的值为真，其它任何值都为假。
    pub fn get_bool(&self, key: &str) -> bool {
        self.get_bool_or_default(key, false)
    }

    /// 获取布尔属性，不存在时返回 `default`
    pub fn get_bool_or_default(&self, key: &str, default: bool) -> bool {
        let entries = self.read_entries();
        entries
            .get(key)
            .map_or(default, |value| value.eq_ignore_ascii_case("true"))
    }

    /// 属性是否存在
    pub fn exists(&self, key: &str) -> bool {
        self.read_entries().contains_key(key)
    }

    /// 检查必需属性，不存在时返回 [`ConfigError::MissingMandatory`]
    pub fn check_mandatory(&self, key: &str) -> ConfigResult<()> {
        if self.read_entries().contains_key(key) {
            Ok(())
        } else {
            Err(ConfigError::MissingMandatory {
                key: key.to_string(),
            })
        }
    }

    /// 设置属性
    pub fn set<K: Into<String>, V: Into<String>>(&self, key: K, value: V) {
        self.write_entries().insert(key.into(), value.into());
    }

    /// 设置可能为空的属性，`None` 保存为空字符串
    pub fn set_optional<K: Into<String>, V: Into<String>>(&self, key: K, value: Option<V>) {
        self.set(key, value.map(Into::into).unwrap_or_default());
    }

    /// 设置布尔属性，保存为 `"true"` 或 `"false"`
    pub fn set_bool<K: Into<String>>(&self, key: K, value: bool) {
        self.set(key, value.to_string());
    }

    /// 按 `key=value` 表达式设置属性
    ///
    /// 以第一个 `=` 分割，值中可以继续包含 `=`。
    pub fn set_from_expression(&self, expr: &str) -> ConfigResult<()> {
        let (key, value) = expr
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidExpression(expr.to_string()))?;
        self.set(key, value);
        Ok(())
    }

    /// 删除属性，不存在时什么也不做
    pub fn remove(&self, key: &str) {
        self.write_entries().remove(key);
    }

    /// 清空所有属性
    pub fn clear(&self) {
        self.write_entries().clear();
    }

    /// 属性数量
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// 是否没有任何属性
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// 按字母顺序返回所有键
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read_entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 获取当前属性的一致快照
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.read_entries()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// 保存当前所有属性到文件
    ///
    /// 先写入目标文件同目录下的临时文件再重命名覆盖目标文件。目标是符号链接时
    /// 写入链接指向的真实文件，已有文件的权限保持不变。
    ///
    /// # 参数
    /// * `path` - 目标文件路径
    ///
    /// # 返回
    /// * `ConfigResult<()>` - 路径为空或写入失败时返回错误
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath);
        }

        let _io_guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.snapshot();
        let comment = format!("Properties saved by {}", crate::APP_NAME);
        let content = serialize_properties(&snapshot, Some(&comment));

        write_atomically(path, content.as_bytes()).map_err(|source| ConfigError::Store {
            path: path.display().to_string(),
            source,
        })?;

        info!("已保存 {} 个属性到 {}", snapshot.len(), path.display());
        Ok(())
    }

    /// 保存当前所有属性到默认属性文件
    pub fn save_default(&self) -> ConfigResult<()> {
        let path = self.default_path.as_deref().ok_or(ConfigError::NoDefaultPath)?;
        self.save_to_path(path)
    }
}

/// 原子写入文件
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    // 符号链接解析到真实文件，重命名只替换真实文件
    let target = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e),
    };
    let permissions = fs::metadata(&target).ok().map(|meta| meta.permissions());

    let file_name = target.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "属性文件路径缺少文件名")
    })?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    let temp_path = target.with_file_name(temp_name);

    let result = write_temp_file(&temp_path, bytes, permissions)
        .and_then(|()| fs::rename(&temp_path, &target));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// 写入临时文件，先设置权限再写内容
fn write_temp_file(
    path: &Path,
    bytes: &[u8],
    permissions: Option<fs::Permissions>,
) -> io::Result<()> {
    let mut file = File::create(path)?;
    if let Some(permissions) = permissions {
        file.set_permissions(permissions)?;
    }
    file.write_all(bytes)?;
    file.sync_all()
}
