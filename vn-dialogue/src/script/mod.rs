//! # Script 模块
//!
//! 脚本行的解析。每一行被拆成三段，再分别交给对应的解析器：
//!
//! ```text
//! raw line ──► split_raw_line ──► speaker  ──► SpeakerData::parse
//!                              ├► dialogue ──► split_segments
//!                              └► commands ──► parse_commands
//! ```
//!
//! 解析永不失败：不规范的输入会得到尽力而为的结果，并记录 `warn!` 日志。

mod command;
mod helpers;
mod line;
mod line_data;
mod reader;
mod segment;
mod speaker;

#[cfg(test)]
mod tests;

pub use command::{Command, parse_commands, split_invocations, tokenize_arguments};
pub use helpers::starts_with_ignore_case;
pub use line::{
    RawLineParts, escape_dialogue, find_command_start, split_raw_line, split_raw_line_with_delimiters,
    unescape_dialogue,
};
pub use line_data::DialogueLineData;
pub use reader::{read_script, split_script_lines};
pub use segment::{DialogueSegment, StartSignal, split_segments};
pub use speaker::{CastExpression, CastPosition, SpeakerData};
