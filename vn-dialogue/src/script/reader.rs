//! # 脚本读取
//!
//! 脚本文件是按行分隔的纯文本，一行对应一个对话单元。

use std::path::Path;

use tracing::debug;

use super::helpers::strip_bom;
use crate::error::ScriptError;

/// 将脚本文本切分为行
///
/// 同时接受 `\n` 与 `\r\n`。`include_blank_lines` 为 `false` 时丢弃空行
/// （只含空白的行仍然保留，交由对话驱动器跳过）。
pub fn split_script_lines(text: &str, include_blank_lines: bool) -> Vec<String> {
    strip_bom(text)
        .lines()
        .filter(|line| include_blank_lines || !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 读取脚本文件
pub fn read_script(
    path: impl AsRef<Path>,
    include_blank_lines: bool,
) -> Result<Vec<String>, ScriptError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let lines = split_script_lines(&text, include_blank_lines);
    debug!(path = %path.display(), lines = lines.len(), "脚本已读取");
    Ok(lines)
}
