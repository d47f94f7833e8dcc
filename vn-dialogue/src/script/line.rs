//! # 行拆分
//!
//! 将一行原始脚本拆成三段原始文本：说话者、对话（引号内）、指令。
//!
//! ```text
//! ganyariya "Hello, World!" playMusic() drawImage(10 40)
//! └ speaker ┘└── dialogue ──┘└────────── commands ─────────┘
//! ```
//!
//! 手写扫描，不依赖正则：
//! - 对话区间：前两个未转义的 `"`（逐字符跟踪反斜杠转义状态）
//! - 指令调用：由单词字符 / `.` / `[` / `]`（以及配置的子指令分隔符）组成、紧跟 `(` 的片段

use serde::{Deserialize, Serialize};

/// 一行脚本的三段原始文本
///
/// 由 [`split_raw_line`] 产生，产生后不再修改。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLineParts {
    /// 说话者原始文本（已去除首尾空白）
    pub speaker: String,
    /// 对话文本（已去掉外层引号，`\"` 与 `\\` 已还原）
    pub dialogue: String,
    /// 指令原始文本（已去除首尾空白）
    pub commands: String,
}

impl RawLineParts {
    fn new(speaker: &str, dialogue: &str, commands: &str) -> Self {
        Self {
            speaker: speaker.trim().to_string(),
            dialogue: unescape_dialogue(dialogue),
            commands: commands.trim().to_string(),
        }
    }
}

/// 拆分一行原始脚本
///
/// 判定顺序：
/// 1. 对话区间之后（或没有对话区间时整行中）存在指令调用 → 说话者 + 对话 + 指令
/// 2. 对话区间之前存在指令调用 → 说话者 + 指令，无对话
/// 3. 存在对话区间 → 说话者 + 对话，无指令
/// 4. 整行都是说话者文本
///
/// 对话内出现的括号（如 `"youkoso()"`）不会被误认为指令。
pub fn split_raw_line(raw: &str) -> RawLineParts {
    split_raw_line_with_delimiters(raw, &[])
}

/// 拆分一行原始脚本，`delimiters` 中的字符也可以出现在指令名中（如 `audio/play(`）
pub fn split_raw_line_with_delimiters(raw: &str, delimiters: &[char]) -> RawLineParts {
    let bounds = find_dialogue_bounds(raw);
    let command_anywhere = find_command_start(raw, delimiters);
    let right_offset = bounds.end.map_or(0, |end| end + 1);
    let command_after = find_command_start(&raw[right_offset..], delimiters);

    if let Some(relative) = command_after {
        return match (bounds.start, bounds.end) {
            (Some(start), Some(end)) => {
                RawLineParts::new(&raw[..start], &raw[start + 1..end], &raw[end + 1..])
            }
            // 没有完整的对话区间时 right_offset 为 0，相对位置即绝对位置
            _ => RawLineParts::new(&raw[..relative], "", &raw[relative..]),
        };
    }

    if let (Some(command), Some(start), Some(end)) = (command_anywhere, bounds.start, bounds.end) {
        if command < start {
            return RawLineParts::new(&raw[..command], "", &raw[command..]);
        }
        // 指令模式只出现在对话内部
        return RawLineParts::new(&raw[..start], &raw[start + 1..end], "");
    }

    match (bounds.start, bounds.end) {
        (Some(start), Some(end)) => RawLineParts::new(&raw[..start], &raw[start + 1..end], ""),
        _ => RawLineParts::new(raw, "", ""),
    }
}

/// 对话区间的字节位置（两个引号本身的位置）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DialogueBounds {
    start: Option<usize>,
    end: Option<usize>,
}

/// 查找前两个未转义的双引号
fn find_dialogue_bounds(raw: &str) -> DialogueBounds {
    let mut bounds = DialogueBounds::default();
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if c == '\\' {
            escaped = !escaped;
        } else if c == '"' && !escaped {
            if bounds.start.is_none() {
                bounds.start = Some(i);
            } else if bounds.end.is_none() {
                bounds.end = Some(i);
            } else {
                break;
            }
        } else {
            escaped = false;
        }
    }

    bounds
}

/// 指令名允许的字符：单词字符、`.`（`ganyariya.move(`）、方括号（`[wait]cmd(`），
/// 以及额外的子指令分隔符
fn is_command_char(c: char, delimiters: &[char]) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '[' | ']') || delimiters.contains(&c)
}

/// 查找第一个指令调用的起始字节位置
///
/// 等价于在文本中寻找最左侧的 `[\w\[\].]+\(`：
/// 取每一段连续的指令字符，若其后紧跟 `(` 则命中该段的起点。
pub fn find_command_start(s: &str, delimiters: &[char]) -> Option<usize> {
    let mut run_start: Option<usize> = None;

    for (i, c) in s.char_indices() {
        if is_command_char(c, delimiters) {
            run_start.get_or_insert(i);
            continue;
        }
        if c == '(' {
            if let Some(start) = run_start {
                return Some(start);
            }
        }
        run_start = None;
    }

    None
}

/// 还原对话中的转义：`\\` → `\`，`\"` → `"`
///
/// 从左到右一次扫描，与 [`find_dialogue_bounds`] 的转义状态一致。
/// 其他反斜杠（如 `\n`）保持原样。
pub fn unescape_dialogue(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | '"')) => out.push(next),
            Some(next) => {
                out.push(c);
                out.push(next);
            }
            None => out.push(c),
        }
    }

    out
}

/// 将对话文本转义为可写回脚本的形式：`\` → `\\`，`"` → `\"`
pub fn escape_dialogue(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
