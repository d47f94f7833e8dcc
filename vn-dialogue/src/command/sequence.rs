//! # 指令序列
//!
//! 多步异步指令的可恢复步骤抽象。每个 tick 调用一次 [`CommandSequence::resume`]，
//! 由返回的 [`Step`] 决定是挂起、结束，还是先执行一个子序列：
//!
//! ```text
//! resume ──► Yield          下一个 tick 再继续
//!        ├─► Done           序列结束
//!        └─► Await(sub)     子序列入栈并立即开始，结束后回到本序列
//! ```
//!
//! 取消通过丢弃序列实现，序列不会再被 resume。

/// 终止回调：进程结束（完成或取消）时调用一次
pub type TerminationCallback<H> = Box<dyn FnOnce(&mut H)>;

/// 指令执行上下文
///
/// 指令通过它访问宿主，并向所属进程注册终止回调。
pub struct CommandContext<'a, H> {
    host: &'a mut H,
    command_name: &'a str,
    terminations: &'a mut Vec<TerminationCallback<H>>,
    delta: f32,
}

impl<'a, H> CommandContext<'a, H> {
    pub(crate) fn new(
        host: &'a mut H,
        command_name: &'a str,
        terminations: &'a mut Vec<TerminationCallback<H>>,
        delta: f32,
    ) -> Self {
        Self {
            host,
            command_name,
            terminations,
            delta,
        }
    }

    pub fn host(&mut self) -> &mut H {
        &mut *self.host
    }

    pub fn host_ref(&self) -> &H {
        &*self.host
    }

    /// 本次 resume 对应的时间增量（秒），分发时的首次执行为 0
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// 分发时使用的指令名
    pub fn command_name(&self) -> &str {
        self.command_name
    }

    /// 为当前进程注册终止回调
    ///
    /// 无论进程自然完成还是被取消，回调都恰好执行一次，按注册顺序调用。
    /// 典型用法是在动画被跳过时把状态直接设为终值。
    pub fn on_terminate(&mut self, callback: impl FnOnce(&mut H) + 'static) {
        self.terminations.push(Box::new(callback));
    }
}

/// 序列单步的结果
pub enum Step<H> {
    /// 挂起到下一个 tick
    Yield,
    /// 序列结束
    Done,
    /// 先执行子序列，结束后继续本序列
    Await(Box<dyn CommandSequence<H>>),
}

impl<H> std::fmt::Debug for Step<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yield => write!(f, "Yield"),
            Self::Done => write!(f, "Done"),
            Self::Await(_) => write!(f, "Await(..)"),
        }
    }
}

/// 可恢复的指令序列
pub trait CommandSequence<H> {
    fn resume(&mut self, ctx: &mut CommandContext<'_, H>) -> Step<H>;
}

/// 等待指定秒数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitSeconds {
    remaining: f32,
}

impl WaitSeconds {
    pub fn new(seconds: f32) -> Self {
        Self { remaining: seconds }
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

impl<H> CommandSequence<H> for WaitSeconds {
    fn resume(&mut self, ctx: &mut CommandContext<'_, H>) -> Step<H> {
        self.remaining -= ctx.delta();
        if self.remaining <= 0.0 {
            Step::Done
        } else {
            Step::Yield
        }
    }
}

/// 由闭包驱动的序列
///
/// 闭包自行保存状态，每次 resume 调用一次。
pub struct FnSequence<F> {
    step: F,
}

impl<F> FnSequence<F> {
    pub fn new<H>(step: F) -> Self
    where
        F: FnMut(&mut CommandContext<'_, H>) -> Step<H>,
    {
        Self { step }
    }
}

impl<H, F> CommandSequence<H> for FnSequence<F>
where
    F: FnMut(&mut CommandContext<'_, H>) -> Step<H>,
{
    fn resume(&mut self, ctx: &mut CommandContext<'_, H>) -> Step<H> {
        (self.step)(ctx)
    }
}

/// 推进一个序列栈，返回栈是否已清空
///
/// 子序列结束后，父序列在同一 tick 内继续执行。
pub(crate) fn drive<H>(
    stack: &mut Vec<Box<dyn CommandSequence<H>>>,
    ctx: &mut CommandContext<'_, H>,
) -> bool {
    while let Some(top) = stack.last_mut() {
        match top.resume(ctx) {
            Step::Yield => return false,
            Step::Done => {
                stack.pop();
            }
            Step::Await(sub) => stack.push(sub),
        }
    }
    true
}
