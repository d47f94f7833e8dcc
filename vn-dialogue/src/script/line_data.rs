//! # 行数据
//!
//! 把拆分后的三段原始文本交给各自的解析器，得到一行脚本的完整结构。

use serde::{Deserialize, Serialize};

use super::command::{Command, parse_commands};
use super::line::{RawLineParts, split_raw_line_with_delimiters};
use super::segment::{DialogueSegment, split_segments};
use super::speaker::SpeakerData;

/// 一行脚本的解析结果
///
/// 保留原始三段文本；为空（或只有空白）的部分对应的结构化数据为 `None`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueLineData {
    raw: RawLineParts,
    speaker: Option<SpeakerData>,
    dialogue: Option<Vec<DialogueSegment>>,
    commands: Option<Vec<Command>>,
}

impl DialogueLineData {
    /// 解析一行原始脚本
    pub fn parse(raw_line: &str) -> Self {
        Self::parse_with_delimiters(raw_line, &[])
    }

    /// 解析一行原始脚本，指令名中允许出现 `delimiters` 中的子指令分隔符
    pub fn parse_with_delimiters(raw_line: &str, delimiters: &[char]) -> Self {
        let raw = split_raw_line_with_delimiters(raw_line, delimiters);

        let speaker = non_blank(&raw.speaker).map(SpeakerData::parse);
        let dialogue = non_blank(&raw.dialogue).map(split_segments);
        let commands = non_blank(&raw.commands)
            .map(parse_commands)
            .filter(|commands| !commands.is_empty());

        Self {
            raw,
            speaker,
            dialogue,
            commands,
        }
    }

    pub fn raw(&self) -> &RawLineParts {
        &self.raw
    }

    pub fn speaker(&self) -> Option<&SpeakerData> {
        self.speaker.as_ref()
    }

    pub fn dialogue(&self) -> Option<&[DialogueSegment]> {
        self.dialogue.as_deref()
    }

    pub fn commands(&self) -> Option<&[Command]> {
        self.commands.as_deref()
    }

    pub fn has_speaker(&self) -> bool {
        self.speaker.is_some()
    }

    pub fn has_dialogue(&self) -> bool {
        self.dialogue.is_some()
    }

    pub fn has_commands(&self) -> bool {
        self.commands.is_some()
    }
}

fn non_blank(s: &str) -> Option<&str> {
    if s.trim().is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::StartSignal;

    #[test]
    fn test_full_line() {
        let line = DialogueLineData::parse(
            r#"ganyariya as ??? "Hello{a} World" [wait]playMusic("Dog Land" -p 10),setMode(normal)"#,
        );

        let speaker = line.speaker().unwrap();
        assert_eq!(speaker.name, "ganyariya");
        assert_eq!(speaker.display_name(), "???");

        let segments = line.dialogue().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start_signal, StartSignal::Append);

        let commands = line.commands().unwrap();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].wait_for_completion);
        assert_eq!(commands[1].name, "setMode");
    }

    #[test]
    fn test_missing_parts_are_none() {
        let line = DialogueLineData::parse("hide");
        assert!(line.has_speaker());
        assert!(!line.has_dialogue());
        assert!(!line.has_commands());

        let line = DialogueLineData::parse("cli()");
        assert!(!line.has_speaker());
        assert!(!line.has_dialogue());
        assert!(line.has_commands());

        let line = DialogueLineData::parse(r#""   ""#);
        assert!(!line.has_dialogue());
        assert_eq!(line.raw().dialogue, "   ");

        let line = DialogueLineData::parse("");
        assert_eq!(line, DialogueLineData::default());
    }

    #[test]
    fn test_slash_sub_command() {
        let line = DialogueLineData::parse("audio/play(theme)");
        assert_eq!(line.commands().unwrap()[0].name, "play");

        let line = DialogueLineData::parse_with_delimiters("audio/play(theme)", &['.', '/']);
        assert!(!line.has_speaker());
        let commands = line.commands().unwrap();
        assert_eq!(commands[0].name, "audio/play");
        assert_eq!(commands[0].arguments, vec!["theme".to_string()]);
    }

    #[test]
    fn test_line_data_serialization() {
        let line = DialogueLineData::parse(r#"Elen at 0.5 "hi{wc 1}bye" wait(1)"#);
        let json = serde_json::to_string(&line).unwrap();
        let restored: DialogueLineData = serde_json::from_str(&json).unwrap();
        assert_eq!(line, restored);
    }
}
