//! # 对话分段
//!
//! 对话文本中可以嵌入控制信号，把一句话拆成多个片段逐段显示：
//!
//! | 信号        | 含义                           |
//! |-------------|--------------------------------|
//! | `{c}`       | 等待推进后清空并显示后续文本   |
//! | `{a}`       | 等待推进后追加后续文本         |
//! | `{wc 1.5}`  | 等待 1.5 秒后清空并显示        |
//! | `{wa 1.5}`  | 等待 1.5 秒后追加              |
//!
//! 片段严格按半开区间划分原文本，信号本身被消费，不出现在任何片段中。

use serde::{Deserialize, Serialize};

/// 片段的起始信号
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartSignal {
    /// 第一个片段，无信号
    #[default]
    None,
    /// `{c}`
    Clear,
    /// `{a}`
    Append,
    /// `{wa N}`
    WaitThenAppend,
    /// `{wc N}`
    WaitThenClear,
}

impl StartSignal {
    /// 信号关键字（不含花括号）
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Clear => Some("c"),
            Self::Append => Some("a"),
            Self::WaitThenAppend => Some("wa"),
            Self::WaitThenClear => Some("wc"),
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "c" => Some(Self::Clear),
            "a" => Some(Self::Append),
            "wa" => Some(Self::WaitThenAppend),
            "wc" => Some(Self::WaitThenClear),
            _ => None,
        }
    }

    fn takes_delay(self) -> bool {
        matches!(self, Self::WaitThenAppend | Self::WaitThenClear)
    }
}

/// 对话片段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueSegment {
    /// 片段文本（可能为空）
    pub text: String,
    /// 起始信号
    pub start_signal: StartSignal,
    /// 信号延迟（秒），仅 `{wa}` / `{wc}` 有意义
    pub signal_delay: f32,
}

impl DialogueSegment {
    pub fn new(text: impl Into<String>, start_signal: StartSignal, signal_delay: f32) -> Self {
        Self {
            text: text.into(),
            start_signal,
            signal_delay,
        }
    }

    /// 是否追加到现有文本之后（而不是清空重写）
    pub fn is_append(&self) -> bool {
        matches!(
            self.start_signal,
            StartSignal::Append | StartSignal::WaitThenAppend
        )
    }

    /// 是否需要先计时等待
    pub fn waits(&self) -> bool {
        self.start_signal.takes_delay()
    }
}

/// 一次信号匹配：字节区间 + 信号 + 延迟
#[derive(Debug, Clone, Copy, PartialEq)]
struct SignalMatch {
    start: usize,
    end: usize,
    signal: StartSignal,
    delay: f32,
}

/// 将对话文本拆分为片段
///
/// 第一个片段总是 [`StartSignal::None`]，即使为空也会保留。
pub fn split_segments(dialogue: &str) -> Vec<DialogueSegment> {
    let matches = find_signals(dialogue);

    let first_end = matches.first().map_or(dialogue.len(), |m| m.start);
    let mut segments = vec![DialogueSegment::new(
        &dialogue[..first_end],
        StartSignal::None,
        0.0,
    )];

    for (i, m) in matches.iter().enumerate() {
        let next_start = matches.get(i + 1).map_or(dialogue.len(), |n| n.start);
        segments.push(DialogueSegment::new(
            &dialogue[m.end..next_start],
            m.signal,
            m.delay,
        ));
    }

    segments
}

/// 扫描所有信号
fn find_signals(s: &str) -> Vec<SignalMatch> {
    let mut matches = Vec::new();
    let mut search_from = 0;

    while let Some(offset) = s[search_from..].find('{') {
        let start = search_from + offset;
        match match_signal(&s[start..]) {
            Some((len, signal, delay)) => {
                matches.push(SignalMatch {
                    start,
                    end: start + len,
                    signal,
                    delay,
                });
                search_from = start + len;
            }
            None => search_from = start + 1,
        }
    }

    matches
}

/// 尝试在 `s` 开头匹配一个信号，返回 (匹配长度, 信号, 延迟)
///
/// 语法：`{` 空白* 关键字 (空白+ 数字)? 空白* `}`
fn match_signal(s: &str) -> Option<(usize, StartSignal, f32)> {
    let body_end = s.find('}')?;
    let body = &s[1..body_end];
    let mut parts = body.split_whitespace();

    // 关键字必须与数字分隔，`{wa3}` 不是信号
    let signal = StartSignal::from_keyword(parts.next()?)?;
    let delay = match parts.next() {
        Some(value) if signal.takes_delay() => parse_delay(value)?,
        Some(_) => return None,
        None => 0.0,
    };
    if parts.next().is_some() {
        return None;
    }

    Some((body_end + 1, signal, delay))
}

/// 延迟只接受 `\d*\.?\d*` 形式，空串或单独的 `.` 视为 0
fn parse_delay(value: &str) -> Option<f32> {
    let mut seen_dot = false;
    for c in value.chars() {
        match c {
            '0'..='9' => {}
            '.' if !seen_dot => seen_dot = true,
            _ => return None,
        }
    }
    if value.chars().all(|c| c == '.') {
        return Some(0.0);
    }
    value.parse().ok()
}
