//! # 指令进程
//!
//! 一次分发对应一个进程：
//!
//! ```text
//! Created ──► Running ──┬─► Completed ──┬─► Terminated
//!                       └─► Cancelled ──┘
//! ```
//!
//! 进入 Terminated 之前，进程的终止回调恰好执行一次，随后进程从活动集合中移除。

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sequence::{CommandContext, CommandSequence, TerminationCallback, drive};

/// 进程标识，单个分发器内单调递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 进程状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    #[default]
    Created,
    Running,
    Completed,
    Cancelled,
    Terminated,
}

#[derive(Debug, Default)]
struct ProcessStatus {
    state: Cell<ProcessState>,
    cancelled: Cell<bool>,
}

/// 进程句柄
///
/// 由分发器返回，调用方用它查询进程是否结束。句柄不持有进程本身，
/// 进程移除后句柄仍然有效。
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    id: ProcessId,
    status: Rc<ProcessStatus>,
}

impl ProcessHandle {
    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn state(&self) -> ProcessState {
        self.status.state.get()
    }

    /// 终止回调已执行、进程已移除
    pub fn is_done(&self) -> bool {
        self.state() == ProcessState::Terminated
    }

    pub fn was_cancelled(&self) -> bool {
        self.status.cancelled.get()
    }
}

/// 活动中的指令进程
pub(crate) struct CommandProcess<H> {
    id: ProcessId,
    name: String,
    args: Vec<String>,
    /// 序列栈，同步指令为空
    stack: Vec<Box<dyn CommandSequence<H>>>,
    terminations: Vec<TerminationCallback<H>>,
    status: Rc<ProcessStatus>,
}

impl<H> CommandProcess<H> {
    pub(crate) fn new(id: ProcessId, name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            args,
            stack: Vec::new(),
            terminations: Vec::new(),
            status: Rc::default(),
        }
    }

    pub(crate) fn id(&self) -> ProcessId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn handle(&self) -> ProcessHandle {
        ProcessHandle {
            id: self.id,
            status: Rc::clone(&self.status),
        }
    }

    /// 构造一个指向本进程的执行上下文
    pub(crate) fn context<'a>(&'a mut self, host: &'a mut H, delta: f32) -> CommandContext<'a, H> {
        CommandContext::new(host, &self.name, &mut self.terminations, delta)
    }

    pub(crate) fn push_sequence(&mut self, sequence: Box<dyn CommandSequence<H>>) {
        self.stack.push(sequence);
    }

    pub(crate) fn set_running(&self) {
        self.status.state.set(ProcessState::Running);
    }

    pub(crate) fn add_termination(&mut self, callback: TerminationCallback<H>) {
        self.terminations.push(callback);
    }

    /// 推进一步，返回进程是否已自然完成
    pub(crate) fn advance(&mut self, host: &mut H, delta: f32) -> bool {
        if self.stack.is_empty() {
            return true;
        }
        let mut ctx = CommandContext::new(host, &self.name, &mut self.terminations, delta);
        drive(&mut self.stack, &mut ctx)
    }

    /// 自然完成：执行终止回调
    pub(crate) fn complete(self, host: &mut H) {
        self.status.state.set(ProcessState::Completed);
        self.terminate(host);
    }

    /// 取消：丢弃未执行的步骤，执行终止回调
    pub(crate) fn cancel(mut self, host: &mut H) {
        self.stack.clear();
        self.status.cancelled.set(true);
        self.status.state.set(ProcessState::Cancelled);
        self.terminate(host);
    }

    fn terminate(self, host: &mut H) {
        debug!(
            id = %self.id,
            command = %self.name,
            callbacks = self.terminations.len(),
            cancelled = self.status.cancelled.get(),
            "指令进程结束"
        );
        for callback in self.terminations {
            callback(host);
        }
        self.status.state.set(ProcessState::Terminated);
    }
}

impl<H> fmt::Debug for CommandProcess<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandProcess")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("args", &self.args)
            .field("depth", &self.stack.len())
            .field("state", &self.status.state.get())
            .finish()
    }
}
