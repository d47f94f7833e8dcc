//! # Engine 模块
//!
//! 运行时上下文：持有指令分发器（以及其中的注册表）与当前对话。
//! 启动时构造一次，以引用方式传递给需要它的地方。
//!
//! ## 执行模型
//!
//! ```text
//! tick(host, input, delta) -> ConversationStatus
//! ```
//!
//! 1. 推进所有指令进程（完成的进程执行终止回调）
//! 2. 推进对话驱动器，直到下一个阻塞点

use std::path::Path;

use tracing::info;

use super::conversation::{Conversation, ConversationInput, ConversationStatus, DialogueHost};
use crate::command::{CommandDispatcher, CommandHost, CommandRegistry, ProcessHandle};
use crate::config::DialogueConfig;
use crate::error::ScriptError;
use crate::script::read_script;

/// 对话运行时
pub struct DialogueRuntime<H> {
    dispatcher: CommandDispatcher<H>,
    conversation: Option<Conversation>,
    config: DialogueConfig,
}

impl<H> DialogueRuntime<H>
where
    H: CommandHost + DialogueHost,
{
    pub fn new(registry: CommandRegistry<H>) -> Self {
        Self::with_config(registry, DialogueConfig::default())
    }

    pub fn with_config(registry: CommandRegistry<H>, config: DialogueConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::with_config(registry, &config),
            conversation: None,
            config,
        }
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<H> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut CommandDispatcher<H> {
        &mut self.dispatcher
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// 开始新的对话；已有对话会先被停止
    pub fn start_conversation(&mut self, lines: Vec<String>) {
        self.stop_conversation();
        self.conversation = Some(Conversation::with_config(lines, &self.config));
    }

    /// 读取脚本文件并开始对话
    pub fn load_script(&mut self, path: impl AsRef<Path>) -> Result<(), ScriptError> {
        let path = path.as_ref();
        let lines = read_script(path, self.config.include_blank_lines)?;
        info!(path = %path.display(), "加载脚本");
        self.start_conversation(lines);
        Ok(())
    }

    /// 停止当前对话，返回是否有对话被停止
    ///
    /// 已分发的指令进程不受影响。
    pub fn stop_conversation(&mut self) -> bool {
        match self.conversation.take() {
            Some(mut conversation) => {
                conversation.stop();
                true
            }
            None => false,
        }
    }

    /// 是否有尚未结束的对话
    pub fn is_running(&self) -> bool {
        self.conversation
            .as_ref()
            .is_some_and(|conversation| !conversation.is_finished())
    }

    /// 直接分发一条指令（不经过对话）
    pub fn execute(&mut self, host: &mut H, name: &str, args: &[String]) -> Option<ProcessHandle> {
        self.dispatcher.execute(host, name, args)
    }

    /// 推进一帧
    pub fn tick(
        &mut self,
        host: &mut H,
        input: Option<ConversationInput>,
        delta: f32,
    ) -> ConversationStatus {
        self.dispatcher.tick(host, delta);
        match self.conversation.as_mut() {
            Some(conversation) => conversation.tick(host, &mut self.dispatcher, input, delta),
            None => ConversationStatus::Finished,
        }
    }
}

impl<H> std::fmt::Debug for DialogueRuntime<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueRuntime")
            .field("dispatcher", &self.dispatcher)
            .field("conversation", &self.conversation)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::builtin;
    use crate::script::SpeakerData;

    #[derive(Default)]
    struct Host {
        text: String,
        log: Vec<String>,
    }

    impl CommandHost for Host {
        type Entity = String;

        fn resolve_entity(&self, name: &str) -> Option<String> {
            (name == "Elen").then(|| name.to_string())
        }
    }

    impl DialogueHost for Host {
        fn show_speaker(&mut self, _speaker: Option<&SpeakerData>) {}

        fn build_text(&mut self, text: &str, _append: bool) {
            self.text = text.to_string();
        }

        fn is_building(&self) -> bool {
            false
        }

        fn hurry_up(&mut self) {}

        fn force_complete(&mut self) {}
    }

    fn host_unit(registry: &mut CommandRegistry<Host>) {
        registry
            .create_sub_registry("character")
            .add_action_with_args("show", |ctx, args| {
                ctx.host().log.push(format!("show {}", args.join(" ")));
                Ok(())
            });
    }

    fn runtime() -> DialogueRuntime<Host> {
        DialogueRuntime::new(CommandRegistry::with_units(&[builtin::general, host_unit]))
    }

    #[test]
    fn test_runtime_without_conversation() {
        let mut runtime = runtime();
        let mut host = Host::default();
        assert!(!runtime.is_running());
        assert!(runtime.tick(&mut host, None, 0.1).is_finished());
        assert!(!runtime.stop_conversation());
    }

    #[test]
    fn test_runtime_drives_wait_command() {
        let mut runtime = runtime();
        let mut host = Host::default();
        runtime.start_conversation(vec![
            "[wait]wait(0.2),Elen.show(-i true)".to_string(),
            r#""done""#.to_string(),
        ]);
        assert!(runtime.is_running());

        let status = runtime.tick(&mut host, None, 0.0);
        assert!(matches!(status, ConversationStatus::WaitForCommand(_)));
        runtime.tick(&mut host, None, 0.1);
        assert!(host.log.is_empty());

        // 指令进程先于对话推进，同一 tick 内即可继续
        assert_eq!(
            runtime.tick(&mut host, None, 0.1),
            ConversationStatus::Running
        );
        assert_eq!(host.log, vec!["show Elen -i true"]);

        assert_eq!(
            runtime.tick(&mut host, None, 0.1),
            ConversationStatus::WaitForAdvance
        );
        assert_eq!(host.text, "done");
        assert_eq!(runtime.dispatcher().active_count(), 0);
    }

    #[test]
    fn test_restart_conversation() {
        let mut runtime = runtime();
        let mut host = Host::default();
        runtime.start_conversation(vec![r#""first""#.to_string()]);
        runtime.tick(&mut host, None, 0.0);
        runtime.start_conversation(vec![r#""second""#.to_string()]);
        runtime.tick(&mut host, None, 0.0);
        assert_eq!(host.text, "second");
    }

    #[test]
    fn test_load_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");
        std::fs::write(&path, "Elen \"hello\"\n").unwrap();

        let mut runtime = runtime();
        let mut host = Host::default();
        runtime.load_script(&path).unwrap();
        runtime.tick(&mut host, None, 0.0);
        assert_eq!(host.text, "hello");

        assert!(runtime.load_script(dir.path().join("missing.txt")).is_err());
        // 加载失败不影响当前对话
        assert!(runtime.is_running());
    }

    #[test]
    fn test_direct_execute() {
        let mut runtime = runtime();
        let mut host = Host::default();
        let handle = runtime.execute(&mut host, "Elen.show", &[]).unwrap();
        runtime.tick(&mut host, None, 0.0);
        assert!(handle.is_done());
        assert!(runtime.execute(&mut host, "ghost.show", &[]).is_none());
    }
}
