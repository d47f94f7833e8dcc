//! # 指令注册表
//!
//! 指令名（大小写不敏感）到可调用对象的映射。
//!
//! 注册表可以包含具名的子注册表，通过 `namespace.verb(...)` 语法访问。
//! 注册单元（[`RegistrationUnit`]）是普通函数，启动时按列表顺序调用一次，
//! 向根注册表及其声明的子注册表中填充指令。

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use super::sequence::{CommandContext, CommandSequence};
use crate::error::CommandResult;

/// 无参数的同步指令
pub type ActionFn<H> = Rc<dyn Fn(&mut CommandContext<'_, H>) -> CommandResult>;
/// 取第一个参数的同步指令
pub type ActionWithArgFn<H> = Rc<dyn Fn(&mut CommandContext<'_, H>, &str) -> CommandResult>;
/// 取全部参数的同步指令
pub type ActionWithArgsFn<H> = Rc<dyn Fn(&mut CommandContext<'_, H>, &[String]) -> CommandResult>;
/// 产生序列的异步指令
pub type SequenceFn<H> = Rc<
    dyn Fn(&mut CommandContext<'_, H>, &[String]) -> CommandResult<Box<dyn CommandSequence<H>>>,
>;

/// 注册单元：向注册表中添加一组指令
pub type RegistrationUnit<H> = fn(&mut CommandRegistry<H>);

/// 可调用对象
///
/// 变体决定分发方式：同步指令在分发时立即执行，进程在下一个 tick 完成；
/// 序列指令逐 tick 推进直到结束。
pub enum Callable<H> {
    Action(ActionFn<H>),
    ActionWithArg(ActionWithArgFn<H>),
    ActionWithArgs(ActionWithArgsFn<H>),
    Sequence(SequenceFn<H>),
}

impl<H> Callable<H> {
    /// 需要的最少参数数量
    pub fn min_arity(&self) -> usize {
        match self {
            Self::ActionWithArg(_) => 1,
            Self::Action(_) | Self::ActionWithArgs(_) | Self::Sequence(_) => 0,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Action(_) => "Action",
            Self::ActionWithArg(_) => "ActionWithArg",
            Self::ActionWithArgs(_) => "ActionWithArgs",
            Self::Sequence(_) => "Sequence",
        }
    }
}

impl<H> Clone for Callable<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Action(f) => Self::Action(Rc::clone(f)),
            Self::ActionWithArg(f) => Self::ActionWithArg(Rc::clone(f)),
            Self::ActionWithArgs(f) => Self::ActionWithArgs(Rc::clone(f)),
            Self::Sequence(f) => Self::Sequence(Rc::clone(f)),
        }
    }
}

impl<H> fmt::Debug for Callable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable::{}", self.kind())
    }
}

/// 指令注册表
pub struct CommandRegistry<H> {
    name: String,
    commands: HashMap<String, Callable<H>>,
    sub_registries: HashMap<String, CommandRegistry<H>>,
    /// (能力标签, 子注册表名)，按绑定顺序尝试
    capability_bindings: Vec<(String, String)>,
}

impl<H> Default for CommandRegistry<H> {
    fn default() -> Self {
        Self::new("root")
    }
}

impl<H> fmt::Debug for CommandRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        let mut subs: Vec<&str> = self.sub_registries.keys().map(String::as_str).collect();
        subs.sort_unstable();
        f.debug_struct("CommandRegistry")
            .field("name", &self.name)
            .field("commands", &names)
            .field("sub_registries", &subs)
            .field("capability_bindings", &self.capability_bindings)
            .finish()
    }
}

impl<H> CommandRegistry<H> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            commands: HashMap::new(),
            sub_registries: HashMap::new(),
            capability_bindings: Vec::new(),
        }
    }

    /// 创建根注册表，并依次调用注册单元
    pub fn with_units(units: &[RegistrationUnit<H>]) -> Self {
        let mut registry = Self::default();
        for unit in units {
            registry.extend(*unit);
        }
        registry
    }

    /// 调用一个注册单元
    pub fn extend(&mut self, unit: RegistrationUnit<H>) {
        unit(self);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 注册指令，名字已存在时保留先注册的指令并返回 `false`
    pub fn add_command(&mut self, name: &str, callable: Callable<H>) -> bool {
        let key = name.to_lowercase();
        if self.commands.contains_key(&key) {
            warn!(registry = %self.name, command = %key, "指令已注册，忽略重复注册");
            return false;
        }
        debug!(registry = %self.name, command = %key, kind = callable.kind(), "注册指令");
        self.commands.insert(key, callable);
        true
    }

    pub fn add_action(
        &mut self,
        name: &str,
        action: impl Fn(&mut CommandContext<'_, H>) -> CommandResult + 'static,
    ) -> bool {
        self.add_command(name, Callable::Action(Rc::new(action)))
    }

    pub fn add_action_with_arg(
        &mut self,
        name: &str,
        action: impl Fn(&mut CommandContext<'_, H>, &str) -> CommandResult + 'static,
    ) -> bool {
        self.add_command(name, Callable::ActionWithArg(Rc::new(action)))
    }

    pub fn add_action_with_args(
        &mut self,
        name: &str,
        action: impl Fn(&mut CommandContext<'_, H>, &[String]) -> CommandResult + 'static,
    ) -> bool {
        self.add_command(name, Callable::ActionWithArgs(Rc::new(action)))
    }

    pub fn add_sequence(
        &mut self,
        name: &str,
        factory: impl Fn(&mut CommandContext<'_, H>, &[String]) -> CommandResult<Box<dyn CommandSequence<H>>>
        + 'static,
    ) -> bool {
        self.add_command(name, Callable::Sequence(Rc::new(factory)))
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_lowercase())
    }

    /// 查找指令，找不到时记录日志并返回 `None`
    pub fn get_command(&self, name: &str) -> Option<Callable<H>> {
        let found = self.find_command(name);
        if found.is_none() {
            debug!(registry = %self.name, command = name, "指令不存在");
        }
        found
    }

    /// 查找指令，不记录日志
    pub(crate) fn find_command(&self, name: &str) -> Option<Callable<H>> {
        self.commands.get(&name.to_lowercase()).cloned()
    }

    /// 已注册的指令名（小写，已排序）
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 创建子注册表
    ///
    /// 同名子注册表已存在时记录警告并返回已有的那个。
    pub fn create_sub_registry(&mut self, name: &str) -> &mut CommandRegistry<H> {
        let key = name.to_lowercase();
        if self.sub_registries.contains_key(&key) {
            warn!(registry = %self.name, sub_registry = %key, "子注册表已存在，返回已有实例");
        }
        self.sub_registries
            .entry(key)
            .or_insert_with_key(|key| CommandRegistry::new(key.as_str()))
    }

    pub fn sub_registry(&self, name: &str) -> Option<&CommandRegistry<H>> {
        self.sub_registries.get(&name.to_lowercase())
    }

    pub fn sub_registry_mut(&mut self, name: &str) -> Option<&mut CommandRegistry<H>> {
        self.sub_registries.get_mut(&name.to_lowercase())
    }

    pub fn has_sub_registry(&self, name: &str) -> bool {
        self.sub_registries.contains_key(&name.to_lowercase())
    }

    /// 将能力标签绑定到子注册表
    ///
    /// 实体指令在实体注册表中找不到时，依次尝试实体具备的能力所绑定的子注册表。
    pub fn bind_capability(&mut self, capability: &str, sub_registry: &str) {
        debug!(capability, sub_registry, "绑定实体能力");
        self.capability_bindings
            .push((capability.to_string(), sub_registry.to_lowercase()));
    }

    pub fn capability_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.capability_bindings
            .iter()
            .map(|(tag, sub)| (tag.as_str(), sub.as_str()))
    }
}
