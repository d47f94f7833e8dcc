//! # 指令分发器
//!
//! 解析指令名、创建进程、逐 tick 推进所有活动进程。
//!
//! ## 名字解析
//!
//! ```text
//! wait                 → 根注册表
//! audio.play           → 子注册表 "audio"
//! ganyariya.move       → 实体 ganyariya：实体注册表 → 能力绑定的子注册表
//!                        参数前插入实体名：move(ganyariya ...)
//! super.ganyariya.move → 以最后一个分隔符切分，目标为 "super.ganyariya"
//! ```
//!
//! 所有状态只在单线程上由分发器修改，不需要加锁。

use std::borrow::Cow;

use tracing::{debug, warn};

use super::CommandHost;
use super::process::{CommandProcess, ProcessHandle, ProcessId};
use super::registry::{Callable, CommandRegistry};
use super::sequence::TerminationCallback;
use crate::config::DialogueConfig;
use crate::error::{CommandError, CommandResult};

/// 解析结果
struct Resolved<'a, H> {
    callable: Callable<H>,
    /// 执行时使用的指令名（子指令为动词部分）
    name: Cow<'a, str>,
    args: Vec<String>,
}

/// 指令分发器
///
/// 独占活动进程集合；进程按分发顺序推进。
pub struct CommandDispatcher<H> {
    registry: CommandRegistry<H>,
    delimiters: Vec<char>,
    entity_registry: String,
    processes: Vec<CommandProcess<H>>,
    next_id: u64,
}

impl<H: CommandHost> CommandDispatcher<H> {
    pub fn new(registry: CommandRegistry<H>) -> Self {
        Self::with_config(registry, &DialogueConfig::default())
    }

    pub fn with_config(registry: CommandRegistry<H>, config: &DialogueConfig) -> Self {
        Self {
            registry,
            delimiters: config.sub_command_delimiters.clone(),
            entity_registry: config.entity_registry.to_lowercase(),
            processes: Vec::new(),
            next_id: 1,
        }
    }

    pub fn registry(&self) -> &CommandRegistry<H> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry<H> {
        &mut self.registry
    }

    /// 分发一条指令
    ///
    /// 同步指令在此处立即执行；序列指令在此处执行第一步。
    /// 指令自身返回的错误只记录日志，进程照常完成。
    pub fn try_execute(
        &mut self,
        host: &mut H,
        name: &str,
        args: &[String],
    ) -> CommandResult<ProcessHandle> {
        let Resolved {
            callable,
            name: resolved_name,
            args,
        } = self.resolve(host, name, args)?;

        let expected = callable.min_arity();
        if args.len() < expected {
            return Err(CommandError::InvalidArity {
                name: name.to_string(),
                expected,
                actual: args.len(),
            });
        }

        let id = ProcessId(self.next_id);
        self.next_id += 1;
        let mut process = CommandProcess::new(id, resolved_name.as_ref(), args);
        let handle = process.handle();
        debug!(id = %id, command = name, args = ?process.args(), "分发指令");

        process.set_running();
        let args = process.args().to_vec();
        let outcome = {
            let mut ctx = process.context(host, 0.0);
            match &callable {
                Callable::Action(f) => f(&mut ctx).map(|_| None),
                Callable::ActionWithArg(f) => f(&mut ctx, &args[0]).map(|_| None),
                Callable::ActionWithArgs(f) => f(&mut ctx, &args).map(|_| None),
                Callable::Sequence(f) => f(&mut ctx, &args).map(Some),
            }
        };
        match outcome {
            Ok(Some(sequence)) => {
                process.push_sequence(sequence);
                // 第一步在分发时执行，结束与否都等到 tick 时统一收尾
                process.advance(host, 0.0);
            }
            Ok(None) => {}
            Err(err) => warn!(id = %id, error = %err, "指令执行失败"),
        }

        self.processes.push(process);
        Ok(handle)
    }

    /// 分发一条指令，失败时记录日志并返回 `None`
    pub fn execute(&mut self, host: &mut H, name: &str, args: &[String]) -> Option<ProcessHandle> {
        match self.try_execute(host, name, args) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(command = name, error = %err, "指令未执行");
                None
            }
        }
    }

    /// 推进所有活动进程，已完成的进程执行终止回调后移除
    pub fn tick(&mut self, host: &mut H, delta: f32) {
        let mut index = 0;
        while index < self.processes.len() {
            if self.processes[index].advance(host, delta) {
                let process = self.processes.remove(index);
                process.complete(host);
            } else {
                index += 1;
            }
        }
    }

    /// 取消指定进程；进程已结束时返回 `false`
    pub fn stop(&mut self, host: &mut H, handle: &ProcessHandle) -> bool {
        self.stop_by_id(host, handle.id())
    }

    pub fn stop_by_id(&mut self, host: &mut H, id: ProcessId) -> bool {
        let Some(index) = self.processes.iter().position(|p| p.id() == id) else {
            return false;
        };
        let process = self.processes.remove(index);
        debug!(id = %id, command = process.name(), "取消指令进程");
        process.cancel(host);
        true
    }

    /// 取消最近启动且仍在运行的进程
    pub fn stop_current(&mut self, host: &mut H) -> bool {
        match self.processes.pop() {
            Some(process) => {
                process.cancel(host);
                true
            }
            None => false,
        }
    }

    /// 取消所有活动进程，返回取消的数量
    pub fn stop_all(&mut self, host: &mut H) -> usize {
        let processes = std::mem::take(&mut self.processes);
        let count = processes.len();
        for process in processes {
            process.cancel(host);
        }
        count
    }

    /// 为最近启动的活动进程注册终止回调；没有活动进程时返回 `false`
    pub fn register_termination_callback(
        &mut self,
        callback: impl FnOnce(&mut H) + 'static,
    ) -> bool {
        match self.processes.last_mut() {
            Some(process) => {
                let callback: TerminationCallback<H> = Box::new(callback);
                process.add_termination(callback);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: ProcessId) -> bool {
        self.processes.iter().any(|p| p.id() == id)
    }

    pub fn active_count(&self) -> usize {
        self.processes.len()
    }

    /// 活动进程的 id，按分发顺序
    pub fn active_ids(&self) -> Vec<ProcessId> {
        self.processes.iter().map(CommandProcess::id).collect()
    }

    fn resolve<'n>(&self, host: &H, name: &'n str, args: &[String]) -> CommandResult<Resolved<'n, H>> {
        let Some((target, verb)) = self.split_sub_command(name) else {
            return self
                .registry
                .find_command(name)
                .map(|callable| Resolved {
                    callable,
                    name: Cow::Borrowed(name),
                    args: args.to_vec(),
                })
                .ok_or_else(|| CommandError::UnknownCommand {
                    name: name.to_string(),
                });
        };

        if let Some(sub) = self.registry.sub_registry(target) {
            return sub
                .find_command(verb)
                .map(|callable| Resolved {
                    callable,
                    name: Cow::Borrowed(name),
                    args: args.to_vec(),
                })
                .ok_or_else(|| CommandError::UnknownSubCommand {
                    registry: target.to_string(),
                    name: verb.to_string(),
                });
        }

        let Some(entity) = host.resolve_entity(target) else {
            return Err(CommandError::UnknownTarget {
                target: target.to_string(),
                name: verb.to_string(),
            });
        };

        // ganyariya.move(-x 10) → move(ganyariya -x 10)
        let mut entity_args = Vec::with_capacity(args.len() + 1);
        entity_args.push(target.to_string());
        entity_args.extend_from_slice(args);

        let entity_registry = self.registry.sub_registry(&self.entity_registry);
        let capability_registries = self
            .registry
            .capability_bindings()
            .filter(|(tag, _)| host.entity_has_capability(&entity, tag))
            .filter_map(|(_, sub)| self.registry.sub_registry(sub));

        entity_registry
            .into_iter()
            .chain(capability_registries)
            .find_map(|registry| registry.find_command(verb))
            .map(|callable| Resolved {
                callable,
                name: Cow::Borrowed(verb),
                args: entity_args,
            })
            .ok_or_else(|| CommandError::UnsupportedEntityCommand {
                entity: target.to_string(),
                name: verb.to_string(),
            })
    }

    /// 以最后一个分隔符切分为 (目标, 动词)；任一侧为空时不视为子指令
    fn split_sub_command<'n>(&self, name: &'n str) -> Option<(&'n str, &'n str)> {
        let (index, delimiter) = name
            .char_indices()
            .rev()
            .find(|(_, c)| self.delimiters.contains(c))?;
        let target = &name[..index];
        let verb = &name[index + delimiter.len_utf8()..];
        if target.is_empty() || verb.is_empty() {
            return None;
        }
        Some((target, verb))
    }
}

impl<H> std::fmt::Debug for CommandDispatcher<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("registry", &self.registry)
            .field("delimiters", &self.delimiters)
            .field("entity_registry", &self.entity_registry)
            .field("processes", &self.processes)
            .finish()
    }
}
