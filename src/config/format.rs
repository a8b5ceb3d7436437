//! 属性文件格式编解码
//!
//! 解析和生成扁平的 `key=value` 属性文本：
//! - `#` 或 `!` 开头的行为注释，空行忽略
//! - 键以第一个未转义的 `=`、`:` 或空白结束
//! - 行尾奇数个反斜杠表示续行
//! - 支持 `\t` `\n` `\r` `\f` `\uXXXX` 转义

use crate::error::{ConfigError, ConfigResult};
use chrono::Utc;
use std::collections::BTreeMap;

/// 属性行中的空白字符
fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// 解析属性文本
///
/// # 参数
/// * `content` - 属性文件内容
///
/// # 返回
/// * `ConfigResult<Vec<(String, String)>>` - 按出现顺序排列的键值对
pub fn parse_properties(content: &str) -> ConfigResult<Vec<(String, String)>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines = normalized.split('\n').enumerate();
    let mut entries = Vec::new();

    while let Some((index, raw)) = lines.next() {
        let line = raw.trim_start_matches(is_blank);
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        // 拼接续行，续行的前导空白被丢弃
        let mut logical = line.to_string();
        while has_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start_matches(is_blank)),
                None => break,
            }
        }

        entries.push(parse_logical_line(&logical, index + 1)?);
    }

    Ok(entries)
}

/// 行尾是否为未转义的反斜杠
fn has_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// 将一个逻辑行拆分为键和值
fn parse_logical_line(line: &str, line_no: usize) -> ConfigResult<(String, String)> {
    let mut key_end = line.len();
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                break;
            }
            c if is_blank(c) => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let raw_key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches(is_blank);
    if let Some(stripped) = rest.strip_prefix(|c: char| c == '=' || c == ':') {
        rest = stripped.trim_start_matches(is_blank);
    }

    Ok((unescape(raw_key, line_no)?, unescape(rest, line_no)?))
}

/// 处理键或值中的转义序列
fn unescape(raw: &str, line: usize) -> ConfigResult<String> {
    let mut out = String::with_capacity(raw.len());
    // `\uXXXX` 是 UTF-16 码元，代理对需要合并后再解码
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_units(&mut units, &mut out);
            out.push(c);
            continue;
        }

        let Some(escaped) = chars.next() else {
            break;
        };

        if escaped == 'u' {
            let hex: String = chars.by_ref().take(4).collect();
            if hex.chars().count() != 4 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
                return Err(ConfigError::Parse {
                    line,
                    message: format!("非法的 \\uxxxx 转义: \\u{hex}"),
                });
            }
            let unit = u16::from_str_radix(&hex, 16).map_err(|e| ConfigError::Parse {
                line,
                message: e.to_string(),
            })?;
            units.push(unit);
            continue;
        }

        flush_units(&mut units, &mut out);
        out.push(match escaped {
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            'f' => '\x0c',
            other => other,
        });
    }

    flush_units(&mut units, &mut out);
    Ok(out)
}

fn flush_units(units: &mut Vec<u16>, out: &mut String) {
    if units.is_empty() {
        return;
    }
    out.extend(
        char::decode_utf16(units.drain(..)).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}

/// 序列化属性集合
///
/// 先写入注释头和时间戳，再按键排序逐行写入 `key=value`。
///
/// # 参数
/// * `entries` - 要写入的属性
/// * `comment` - 注释头（可选）
///
/// # 返回
/// * `String` - 属性文件文本
pub fn serialize_properties(entries: &BTreeMap<String, String>, comment: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(comment) = comment {
        for line in comment.lines() {
            out.push('#');
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push('#');
    out.push_str(&Utc::now().format("%a %b %d %H:%M:%S UTC %Y").to_string());
    out.push('\n');

    for (key, value) in entries {
        escape_into(&mut out, key, true);
        out.push('=');
        escape_into(&mut out, value, false);
        out.push('\n');
    }

    out
}

/// 转义单个键或值，键中的所有空格都需要转义，值只转义前导空格
fn escape_into(out: &mut String, text: &str, escape_space: bool) {
    for (i, c) in text.chars().enumerate() {
        match c {
            ' ' if escape_space || i == 0 => out.push_str("\\ "),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
}
