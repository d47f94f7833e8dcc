//! 内置注册单元

use tracing::debug;

use super::registry::CommandRegistry;
use super::sequence::{CommandContext, CommandSequence, Step, WaitSeconds};

/// 通用指令：`wait(seconds)`
///
/// 秒数无法解析时立即结束。
pub fn general<H>(registry: &mut CommandRegistry<H>) {
    registry.add_sequence("wait", |_ctx, args| {
        let seconds = args
            .first()
            .and_then(|raw| raw.trim().parse::<f32>().ok())
            .filter(|s| s.is_finite());
        let sequence: Box<dyn CommandSequence<H>> = match seconds {
            Some(seconds) => Box::new(WaitSeconds::new(seconds)),
            None => {
                debug!(args = ?args, "wait 参数无法解析，立即结束");
                Box::new(Finished)
            }
        };
        Ok(sequence)
    });
}

/// 立即结束的序列
struct Finished;

impl<H> CommandSequence<H> for Finished {
    fn resume(&mut self, _ctx: &mut CommandContext<'_, H>) -> Step<H> {
        Step::Done
    }
}
