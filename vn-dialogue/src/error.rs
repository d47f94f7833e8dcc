//! # Error 模块
//!
//! 定义 vn-dialogue 中使用的错误类型。
//!
//! 解析阶段不产生错误：格式不规范的行会被尽力拆分，并通过 `tracing` 记录警告。
//! 这里的错误只出现在指令分发、脚本读取与配置加载中。

use std::path::PathBuf;

use thiserror::Error;

/// 指令错误
///
/// 指令分发与执行过程中的所有失败都归入此类型。
/// 对外的 `execute` 只记录日志并返回 `None`，不会中断脚本播放。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// 根注册表中没有该指令
    #[error("未知指令 '{name}'")]
    UnknownCommand { name: String },

    /// 子注册表存在，但其中没有该指令
    #[error("子注册表 '{registry}' 中没有指令 '{name}'")]
    UnknownSubCommand { registry: String, name: String },

    /// 点号前的目标既不是子注册表，也不是可解析的实体
    #[error("'{target}' 既不是子注册表也不是实体，指令 '{name}' 未执行")]
    UnknownTarget { target: String, name: String },

    /// 实体存在，但没有任何可用的注册表提供该指令
    #[error("实体 '{entity}' 无法执行指令 '{name}'")]
    UnsupportedEntityCommand { entity: String, name: String },

    /// 参数数量不足
    #[error("指令 '{name}' 至少需要 {expected} 个参数，实际 {actual} 个")]
    InvalidArity {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// 参数值无效
    #[error("指令 '{name}' 的参数无效 - {message}")]
    InvalidArgument { name: String, message: String },

    /// 宿主侧执行失败
    #[error("指令 '{name}' 执行失败 - {message}")]
    Failed { name: String, message: String },
}

impl CommandError {
    /// 创建参数无效错误
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// 创建执行失败错误
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// 脚本读取错误
#[derive(Error, Debug)]
pub enum ScriptError {
    /// 无法读取脚本文件
    #[error("无法读取脚本 {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 无法读取配置文件
    #[error("无法读取配置 {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件格式错误
    #[error("配置解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 配置值不合法
    #[error("配置验证失败: {0}")]
    Invalid(String),
}

/// Result 类型别名
pub type CommandResult<T = ()> = Result<T, CommandError>;
