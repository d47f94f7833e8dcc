//! # Command 模块
//!
//! 指令的注册、分发与执行。
//!
//! ```text
//! CommandRegistry  名字 → Callable（含子注册表）
//!       │
//! CommandDispatcher  解析名字 → 创建 CommandProcess → 逐 tick 推进
//!       │
//! CommandContext  指令访问宿主、注册终止回调
//! ```
//!
//! 宿主通过 [`CommandHost`] 提供实体解析；实际效果（移动、显示、播放音频）
//! 由宿主注册到注册表中的闭包完成，核心不关心其内容。

pub mod builtin;
mod dispatcher;
mod params;
mod process;
mod registry;
mod sequence;

pub use dispatcher::CommandDispatcher;
pub use params::{CommandParameterFetcher, ParamValue};
pub use process::{ProcessHandle, ProcessId, ProcessState};
pub use registry::{
    ActionFn, ActionWithArgFn, ActionWithArgsFn, Callable, CommandRegistry, RegistrationUnit,
    SequenceFn,
};
pub use sequence::{
    CommandContext, CommandSequence, FnSequence, Step, TerminationCallback, WaitSeconds,
};

/// 宿主侧的实体查询接口
///
/// 指令以 `target.verb(...)` 形式指向一个具名实体（如角色）时，
/// 分发器通过它确认实体存在并查询实体的能力标签。
pub trait CommandHost {
    /// 实体句柄
    type Entity;

    /// 按名字解析实体，不存在时返回 `None`
    fn resolve_entity(&self, _name: &str) -> Option<Self::Entity> {
        None
    }

    /// 实体是否具备某个能力（决定实体指令路由到哪个子注册表）
    fn entity_has_capability(&self, _entity: &Self::Entity, _capability: &str) -> bool {
        false
    }
}
