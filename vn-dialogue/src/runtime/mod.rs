//! # Runtime 模块
//!
//! 对话驱动器与运行时上下文。

mod conversation;
mod engine;

pub use conversation::{Conversation, ConversationInput, ConversationStatus, DialogueHost};
pub use engine::DialogueRuntime;
