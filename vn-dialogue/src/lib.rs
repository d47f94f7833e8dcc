//! # VN Dialogue
//!
//! 对话脚本解析与指令分发的核心库。
//!
//! ## 架构概述
//!
//! `vn-dialogue` 不依赖任何渲染或音频引擎。脚本逐行解析为结构化数据，
//! 对话驱动器按行播放，并通过分发器执行宿主注册的指令：
//!
//! ```text
//! raw line ──► DialogueLineData ──► Conversation ──► CommandDispatcher ──► Host 闭包
//!                 │                      │                  │
//!           speaker / segments /    DialogueHost       CommandRegistry
//!              commands             (文本框)          (名字 → Callable)
//! ```
//!
//! 宿主实现两个接口：
//!
//! - [`CommandHost`]：实体解析，用于 `ganyariya.move(...)` 形式的实体指令
//! - [`DialogueHost`]：说话者与对话文本的显示
//!
//! ## 使用示例
//!
//! ```ignore
//! use vn_dialogue::{CommandRegistry, DialogueRuntime, ConversationInput, builtin};
//!
//! let registry = CommandRegistry::with_units(&[builtin::general, my_commands]);
//! let mut runtime = DialogueRuntime::new(registry);
//! runtime.load_script("scripts/chapter1.txt")?;
//!
//! // 主循环
//! loop {
//!     let status = runtime.tick(&mut host, input.take(), delta);
//!     if status.is_finished() {
//!         break;
//!     }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`script`]：行拆分、说话者、对话片段、指令文本解析
//! - [`command`]：注册表、分发器、进程、参数提取
//! - [`runtime`]：对话驱动器与运行时上下文
//! - [`config`]：配置
//! - [`error`]：错误类型定义

pub mod command;
pub mod config;
pub mod error;
pub mod runtime;
pub mod script;

// 重导出核心类型
pub use command::{
    Callable, CommandContext, CommandDispatcher, CommandHost, CommandParameterFetcher,
    CommandRegistry, CommandSequence, FnSequence, ParamValue, ProcessHandle, ProcessId,
    ProcessState, RegistrationUnit, Step, WaitSeconds, builtin,
};
pub use config::DialogueConfig;
pub use error::{CommandError, CommandResult, ConfigError, ScriptError};
pub use runtime::{
    Conversation, ConversationInput, ConversationStatus, DialogueHost, DialogueRuntime,
};
pub use script::{
    CastExpression, CastPosition, Command, DialogueLineData, DialogueSegment, RawLineParts,
    SpeakerData, StartSignal, parse_commands, read_script, split_raw_line, split_segments,
};
