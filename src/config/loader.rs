//! 属性文件读取
//!
//! 提供默认属性文件路径解析，以及从文件或输入流读取并解析属性的功能

use crate::config::format::parse_properties;
use crate::error::{ConfigError, ConfigResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// 获取默认属性文件路径
///
/// 默认文件位于用户主目录下，文件名为 `.` 加应用名称（例如 `~/.propstore`）。
///
/// # 返回
/// * `Option<PathBuf>` - 无法确定用户主目录时返回 `None`
pub fn get_default_property_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{}", crate::APP_NAME)))
}

/// 从文件读取属性
///
/// # 参数
/// * `path` - 属性文件路径
///
/// # 返回
/// * `ConfigResult<Vec<(String, String)>>` - 解析出的键值对或错误
pub fn read_property_file(path: &Path) -> ConfigResult<Vec<(String, String)>> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyPath);
    }

    let not_readable = || ConfigError::FileNotReadable {
        path: path.display().to_string(),
    };

    // 目录也能被打开，需要单独排除
    if !path.is_file() {
        return Err(not_readable());
    }
    let file = File::open(path).map_err(|e| {
        log::debug!("打开属性文件失败: {}: {}", path.display(), e);
        not_readable()
    })?;

    let entries = read_properties(file)?;
    log::debug!("从 {} 读取 {} 个属性", path.display(), entries.len());
    Ok(entries)
}

/// 从输入流读取属性
///
/// 数据优先按UTF-8解码；不是合法UTF-8时按ISO-8859-1解码，
/// 兼容旧版本按Latin-1写出的属性文件。读取失败视为加载失败。
///
/// # 参数
/// * `reader` - 可读的输入流
///
/// # 返回
/// * `ConfigResult<Vec<(String, String)>>` - 解析出的键值对或错误
pub fn read_properties<R: Read>(mut reader: R) -> ConfigResult<Vec<(String, String)>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(ConfigError::Load)?;

    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            log::debug!("属性数据不是合法的UTF-8，按ISO-8859-1解码: {}", e.utf8_error());
            decode_latin1(e.as_bytes())
        }
    };

    parse_properties(&content)
}

/// ISO-8859-1 的每个字节即对应的Unicode码点
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
