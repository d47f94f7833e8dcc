//! # Host CLI
//!
//! 对话脚本的终端宿主。
//!
//! - [`stage`]：舞台状态，实现 `CommandHost` 与 `DialogueHost`
//! - [`commands`]：角色与音频指令的注册单元
//! - [`check`]：脚本静态检查
//! - [`config`]：宿主配置

pub mod check;
pub mod commands;
pub mod config;
pub mod stage;
