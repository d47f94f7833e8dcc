//! # 指令文本解析
//!
//! 将一行的指令文本解析为结构化的 [`Command`] 列表：
//!
//! ```text
//! setMode(normal),[wait]playMusic("Dog Land" -p 10)
//! -> Command { name: "setMode",   arguments: ["normal"],               wait: false }
//! -> Command { name: "playMusic", arguments: ["Dog Land", "-p", "10"], wait: true  }
//! ```
//!
//! 调用之间以顶层逗号分隔；一个调用的 `)` 回到顶层时也视为结束，
//! 因此 `playMusic() drawImage(10 40)` 同样得到两条指令。
//! 引号与括号内部的逗号不会切分调用。

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::helpers::starts_with_ignore_case;

const COMMANDS_SPLITTER: char = ',';
const ARGUMENTS_IDENTIFIER: char = '(';
const ARGUMENTS_TERMINATOR: char = ')';
const WAIT_COMMAND_PREFIX: &str = "[wait]";

/// 一条指令调用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// 指令名（已去掉 `[wait]` 前缀）
    pub name: String,
    /// 参数，引号内的内容保持为单个参数
    pub arguments: Vec<String>,
    /// 驱动器是否等待该指令完成
    pub wait_for_completion: bool,
}

impl Command {
    pub fn new(name: impl Into<String>, arguments: Vec<String>, wait_for_completion: bool) -> Self {
        Self {
            name: name.into(),
            arguments,
            wait_for_completion,
        }
    }

    /// 解析单个调用文本，如 `[wait]setMode(normal -v 10)`
    pub fn parse(invocation: &str) -> Self {
        let invocation = invocation.trim();

        let (raw_name, raw_args) = match invocation.find(ARGUMENTS_IDENTIFIER) {
            Some(open) => {
                let inner = &invocation[open + 1..];
                let inner = match inner.strip_suffix(ARGUMENTS_TERMINATOR) {
                    Some(inner) => inner,
                    None => {
                        warn!(invocation, "指令参数缺少右括号，按行尾截断");
                        inner
                    }
                };
                (&invocation[..open], inner)
            }
            None => (invocation, ""),
        };

        let mut name = raw_name.trim();
        let mut wait_for_completion = false;
        if starts_with_ignore_case(name, WAIT_COMMAND_PREFIX) {
            wait_for_completion = true;
            name = name[WAIT_COMMAND_PREFIX.len()..].trim();
        }

        Self::new(name, tokenize_arguments(raw_args), wait_for_completion)
    }
}

/// 序列化为可重新解析的调用文本
///
/// 含分隔符、引号、括号或为空的参数会加引号，内部的 `"` 与 `\` 以反斜杠转义。
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wait_for_completion {
            write!(f, "{WAIT_COMMAND_PREFIX}")?;
        }
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", quote_argument(arg))?;
        }
        write!(f, ")")
    }
}

fn quote_argument(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '"' | '\\' | '(' | ')'));
    if !needs_quotes {
        return arg.to_string();
    }
    let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// 解析一行的完整指令文本
pub fn parse_commands(raw: &str) -> Vec<Command> {
    split_invocations(raw)
        .into_iter()
        .map(Command::parse)
        .collect()
}

/// 按顶层逗号 / 顶层右括号切分调用，丢弃空项
pub fn split_invocations(raw: &str) -> Vec<&str> {
    let mut invocations = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut chars = raw.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some((_, '"')) | Some((_, '\\'))) => {
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            ARGUMENTS_IDENTIFIER => depth += 1,
            ARGUMENTS_TERMINATOR if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    push_invocation(raw, start, i + 1, &mut invocations);
                    start = i + 1;
                }
            }
            COMMANDS_SPLITTER if depth == 0 => {
                push_invocation(raw, start, i, &mut invocations);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_invocation(raw, start, raw.len(), &mut invocations);

    invocations
}

fn push_invocation<'a>(raw: &'a str, from: usize, to: usize, out: &mut Vec<&'a str>) {
    let item = raw[from..to].trim();
    if !item.is_empty() {
        out.push(item);
    }
}

/// 引号感知的参数分词
///
/// - `"` 切换引号状态，引号本身不进入参数
/// - 引号外的空白或逗号结束当前参数
/// - `\"` 与 `\\` 产生字面字符
/// - 引号包裹的空串 `""` 保留为空参数
pub fn tokenize_arguments(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some('"') | Some('\\')) => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if !in_quotes && (c.is_whitespace() || c == COMMANDS_SPLITTER) => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        warn!(raw, "参数中的引号未闭合");
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }

    tokens
}
