//! # 对话驱动器
//!
//! 逐行播放脚本：显示说话者，按片段信号逐段构建对话文本，
//! 等待玩家推进后按书写顺序分发该行的指令。
//!
//! ## 单行流程
//!
//! ```text
//! 说话者 ──► 片段 0 ──► 片段 1 ──► ... ──► 等待推进 ──► 指令 0 ──► 指令 1 ──► ...
//!             │  {c}/{a}：等待推进
//!             │  {wc N}/{wa N}：等待 N 秒
//!             └  构建中推进：先加速，再直接完成
//! ```
//!
//! 只有 `[wait]` 指令会阻塞驱动器；阻塞期间的推进会停止该指令的进程，
//! 其终止回调随即执行。

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command::{CommandDispatcher, CommandHost, ProcessHandle, ProcessId};
use crate::config::DialogueConfig;
use crate::script::{Command, DialogueLineData, DialogueSegment, SpeakerData, StartSignal};

/// 对话显示接口（文本框）
///
/// 文本逐字出现等动画由宿主实现，驱动器只关心是否仍在构建。
pub trait DialogueHost {
    /// 显示说话者；`None` 表示该行没有说话者
    fn show_speaker(&mut self, speaker: Option<&SpeakerData>);

    /// 开始构建文本，`append` 为 `true` 时追加到现有文本之后
    fn build_text(&mut self, text: &str, append: bool);

    /// 文本是否仍在构建
    fn is_building(&self) -> bool;

    /// 加速构建
    fn hurry_up(&mut self);

    /// 立即完成构建
    fn force_complete(&mut self);
}

/// 驱动器接收的输入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationInput {
    /// 玩家推进（点击 / 按键）
    Advance,
}

/// 每个 tick 结束时驱动器的状态
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConversationStatus {
    /// 一行已结束，下一个 tick 开始下一行
    Running,
    /// 等待玩家推进
    WaitForAdvance,
    /// 等待剩余秒数
    WaitForTime(f32),
    /// 等待文本构建完成
    WaitForBuild,
    /// 等待 `[wait]` 指令完成
    WaitForCommand(ProcessId),
    /// 所有行已播放完毕
    Finished,
}

impl ConversationStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SegmentStage {
    Start,
    WaitAdvance,
    WaitDelay(f32),
    Building { hurried: bool },
}

#[derive(Debug)]
enum Phase {
    /// 准备读取下一行
    Idle,
    Segment { index: usize, stage: SegmentStage },
    /// 最后一个片段之后等待推进
    AwaitAdvance,
    Commands {
        index: usize,
        waiting: Option<ProcessHandle>,
    },
    Finished,
}

enum Flow {
    Continue(Phase),
    Block(Phase, ConversationStatus),
}

/// 本 tick 尚未消费的输入；推进与时间增量各自只能被消费一次
struct Pending {
    advance: bool,
    delta: f32,
}

impl Pending {
    fn take_advance(&mut self) -> bool {
        std::mem::take(&mut self.advance)
    }

    fn take_delta(&mut self) -> f32 {
        std::mem::take(&mut self.delta)
    }
}

/// 对话驱动器
#[derive(Debug)]
pub struct Conversation {
    lines: Vec<String>,
    /// 下一个要读取的行
    cursor: usize,
    current: Option<DialogueLineData>,
    phase: Phase,
    two_stage_skip: bool,
    /// 行拆分时允许出现在指令名中的子指令分隔符
    delimiters: Vec<char>,
}

impl Conversation {
    pub fn new(lines: Vec<String>) -> Self {
        Self::with_config(lines, &DialogueConfig::default())
    }

    pub fn with_config(lines: Vec<String>, config: &DialogueConfig) -> Self {
        info!(lines = lines.len(), "开始对话");
        Self {
            lines,
            cursor: 0,
            current: None,
            phase: Phase::Idle,
            two_stage_skip: config.two_stage_skip,
            delimiters: config.sub_command_delimiters.clone(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }

    /// 当前行在脚本中的索引
    pub fn line_index(&self) -> Option<usize> {
        self.current.as_ref().map(|_| self.cursor - 1)
    }

    pub fn current_line(&self) -> Option<&DialogueLineData> {
        self.current.as_ref()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// 结束对话，不再读取后续行
    pub fn stop(&mut self) {
        if !self.is_finished() {
            info!(line = ?self.line_index(), "对话被停止");
        }
        self.phase = Phase::Finished;
        self.current = None;
    }

    /// 推进驱动器，直到遇到阻塞点
    pub fn tick<H>(
        &mut self,
        host: &mut H,
        dispatcher: &mut CommandDispatcher<H>,
        input: Option<ConversationInput>,
        delta: f32,
    ) -> ConversationStatus
    where
        H: CommandHost + DialogueHost,
    {
        let mut pending = Pending {
            advance: matches!(input, Some(ConversationInput::Advance)),
            delta,
        };

        loop {
            let phase = std::mem::replace(&mut self.phase, Phase::Idle);
            let flow = match phase {
                Phase::Idle => self.next_line(host),
                Phase::Segment { index, stage } => {
                    self.step_segment(index, stage, host, &mut pending)
                }
                Phase::AwaitAdvance => self.step_await_advance(&mut pending),
                Phase::Commands { index, waiting } => {
                    self.step_commands(index, waiting, host, dispatcher, &mut pending)
                }
                Phase::Finished => Flow::Block(Phase::Finished, ConversationStatus::Finished),
            };

            match flow {
                Flow::Continue(next) => self.phase = next,
                Flow::Block(next, status) => {
                    self.phase = next;
                    return status;
                }
            }
        }
    }

    fn next_line<H: DialogueHost>(&mut self, host: &mut H) -> Flow {
        while let Some(raw) = self.lines.get(self.cursor) {
            self.cursor += 1;
            if raw.trim().is_empty() {
                continue;
            }

            let line = DialogueLineData::parse_with_delimiters(raw, &self.delimiters);
            let phase = if line.has_dialogue() {
                host.show_speaker(line.speaker());
                Phase::Segment {
                    index: 0,
                    stage: SegmentStage::Start,
                }
            } else if line.has_commands() {
                Phase::Commands {
                    index: 0,
                    waiting: None,
                }
            } else {
                debug!(line = self.cursor - 1, raw = %raw, "该行没有对话与指令，跳过");
                continue;
            };

            debug!(line = self.cursor - 1, "执行脚本行");
            self.current = Some(line);
            return Flow::Continue(phase);
        }

        info!("对话结束");
        self.current = None;
        Flow::Block(Phase::Finished, ConversationStatus::Finished)
    }

    fn segments(&self) -> &[DialogueSegment] {
        self.current
            .as_ref()
            .and_then(DialogueLineData::dialogue)
            .unwrap_or_default()
    }

    fn commands(&self) -> &[Command] {
        self.current
            .as_ref()
            .and_then(DialogueLineData::commands)
            .unwrap_or_default()
    }

    fn step_segment<H: DialogueHost>(
        &self,
        index: usize,
        stage: SegmentStage,
        host: &mut H,
        pending: &mut Pending,
    ) -> Flow {
        let segments = self.segments();
        let Some(segment) = segments.get(index) else {
            return Flow::Continue(Phase::AwaitAdvance);
        };
        let block = |stage, status| Flow::Block(Phase::Segment { index, stage }, status);

        match stage {
            SegmentStage::Start => match segment.start_signal {
                StartSignal::None => build(segment, index, host),
                StartSignal::Clear | StartSignal::Append => Flow::Continue(Phase::Segment {
                    index,
                    stage: SegmentStage::WaitAdvance,
                }),
                // 计时从下一个 tick 开始，进入等待的这一 tick 不扣除增量
                StartSignal::WaitThenAppend | StartSignal::WaitThenClear => {
                    let delay = segment.signal_delay;
                    if delay <= 0.0 {
                        build(segment, index, host)
                    } else {
                        block(
                            SegmentStage::WaitDelay(delay),
                            ConversationStatus::WaitForTime(delay),
                        )
                    }
                }
            },
            SegmentStage::WaitAdvance => {
                if pending.take_advance() {
                    build(segment, index, host)
                } else {
                    block(stage, ConversationStatus::WaitForAdvance)
                }
            }
            SegmentStage::WaitDelay(remaining) => {
                let remaining = remaining - pending.take_delta();
                if remaining <= 0.0 {
                    build(segment, index, host)
                } else {
                    block(
                        SegmentStage::WaitDelay(remaining),
                        ConversationStatus::WaitForTime(remaining),
                    )
                }
            }
            SegmentStage::Building { hurried } => {
                if !host.is_building() {
                    let next = index + 1;
                    return if next < segments.len() {
                        Flow::Continue(Phase::Segment {
                            index: next,
                            stage: SegmentStage::Start,
                        })
                    } else {
                        Flow::Continue(Phase::AwaitAdvance)
                    };
                }
                if !pending.take_advance() {
                    return block(stage, ConversationStatus::WaitForBuild);
                }
                if self.two_stage_skip && !hurried {
                    host.hurry_up();
                } else {
                    host.force_complete();
                }
                Flow::Continue(Phase::Segment {
                    index,
                    stage: SegmentStage::Building { hurried: true },
                })
            }
        }
    }

    fn step_await_advance(&self, pending: &mut Pending) -> Flow {
        if !pending.take_advance() {
            return Flow::Block(Phase::AwaitAdvance, ConversationStatus::WaitForAdvance);
        }
        if self.commands().is_empty() {
            Flow::Block(Phase::Idle, ConversationStatus::Running)
        } else {
            Flow::Continue(Phase::Commands {
                index: 0,
                waiting: None,
            })
        }
    }

    fn step_commands<H>(
        &self,
        index: usize,
        waiting: Option<ProcessHandle>,
        host: &mut H,
        dispatcher: &mut CommandDispatcher<H>,
        pending: &mut Pending,
    ) -> Flow
    where
        H: CommandHost,
    {
        let next = Phase::Commands {
            index: index + 1,
            waiting: None,
        };

        if let Some(handle) = waiting {
            if handle.is_done() {
                return Flow::Continue(next);
            }
            if pending.take_advance() {
                debug!(id = %handle.id(), "跳过等待中的指令");
                dispatcher.stop(host, &handle);
                return Flow::Continue(next);
            }
            let id = handle.id();
            return Flow::Block(
                Phase::Commands {
                    index,
                    waiting: Some(handle),
                },
                ConversationStatus::WaitForCommand(id),
            );
        }

        let Some(command) = self.commands().get(index) else {
            return Flow::Block(Phase::Idle, ConversationStatus::Running);
        };
        match dispatcher.execute(host, &command.name, &command.arguments) {
            Some(handle) if command.wait_for_completion => Flow::Continue(Phase::Commands {
                index,
                waiting: Some(handle),
            }),
            _ => Flow::Continue(next),
        }
    }
}

fn build<H: DialogueHost>(segment: &DialogueSegment, index: usize, host: &mut H) -> Flow {
    host.build_text(&segment.text, segment.is_append());
    Flow::Continue(Phase::Segment {
        index,
        stage: SegmentStage::Building { hurried: false },
    })
}
