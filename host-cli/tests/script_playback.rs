//! # 脚本播放集成测试
//!
//! 测试 脚本 → DialogueRuntime → 宿主指令 → Stage 的完整链路。
//! 不读取终端输入，等待推进时直接推进。

use std::path::{Path, PathBuf};

use host_cli::check::ScriptChecker;
use host_cli::commands;
use host_cli::stage::{Stage, StageEvent};
use vn_dialogue::{ConversationInput, ConversationStatus, DialogueConfig, DialogueRuntime};

const DELTA: f32 = 0.1;
const MAX_TICKS: usize = 2_000;

fn demo_script() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/scripts/demo.txt")
}

/// 自动推进直到播放结束，返回 (tick 数, 事件)
fn play(runtime: &mut DialogueRuntime<Stage>, stage: &mut Stage) -> (usize, Vec<StageEvent>) {
    let mut events = Vec::new();
    let mut input = None;

    for tick in 0..MAX_TICKS {
        stage.update(DELTA);
        let status = runtime.tick(stage, input.take(), DELTA);
        events.extend(stage.drain_events());

        match status {
            ConversationStatus::Finished if runtime.dispatcher().active_count() == 0 => {
                return (tick + 1, events);
            }
            ConversationStatus::WaitForAdvance => input = Some(ConversationInput::Advance),
            _ => {}
        }
    }
    panic!("脚本在 {MAX_TICKS} 个 tick 内没有结束");
}

fn texts(events: &[StageEvent]) -> Vec<(&str, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            StageEvent::Text { text, append } => Some((text.as_str(), *append)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_inline_script() {
    let lines = [
        "createCharacter(Elen)",
        r#"Elen [0:Happy] at 0.5 "你好{a}世界" Elen.move(-x 1 -speed 10)"#,
        r#""……" [wait]wait(0.3), showCharacters(Elen -i true)"#,
        "playbgm(theme), stopbgm()",
    ];

    let mut stage = Stage::new(0.0);
    let mut runtime = DialogueRuntime::new(commands::registry());
    runtime.start_conversation(lines.iter().map(|s| s.to_string()).collect());

    let (_, events) = play(&mut runtime, &mut stage);

    assert_eq!(
        texts(&events),
        vec![("你好", false), ("世界", true), ("……", false)]
    );
    let speakers: Vec<&StageEvent> = events
        .iter()
        .filter(|event| matches!(event, StageEvent::Speaker(_)))
        .collect();
    assert_eq!(
        speakers,
        vec![
            &StageEvent::Speaker(Some("Elen".to_string())),
            &StageEvent::Speaker(None)
        ]
    );

    let elen = stage.character("Elen").unwrap();
    assert!(elen.visible);
    assert_eq!(elen.position, (1.0, 0.0));
    assert_eq!(elen.expressions.get(&0).map(String::as_str), Some("Happy"));
    assert!(stage.bgm().is_none());
    assert!(!runtime.is_running());
}

#[test]
fn test_demo_script_plays_to_end() {
    let mut stage = Stage::new(20.0);
    let mut runtime = DialogueRuntime::new(commands::registry());
    runtime.load_script(demo_script()).unwrap();

    let (ticks, events) = play(&mut runtime, &mut stage);
    // {wc 0.5} 与 wait(1) 至少需要 15 个 tick
    assert!(ticks >= 15, "ticks = {ticks}");

    let shown = texts(&events);
    assert_eq!(shown.first(), Some(&("早上好。", false)));
    assert!(shown.contains(&("……不去也没关系。", false)));

    let elen = stage.character("Elen").unwrap();
    assert!(!elen.visible);
    assert!((elen.position.0 - 0.7).abs() < 1e-5);
    assert_eq!(elen.expressions.get(&0).map(String::as_str), Some("Angry"));
    assert!(stage.bgm().is_none());
    assert!(stage.sfx().is_empty());
}

#[test]
fn test_demo_script_passes_check() {
    let registry = commands::registry();
    let config = DialogueConfig::default();
    let checker = ScriptChecker::new(&registry, &config);

    let mut parsed = 0;
    let report = checker
        .check_path(&demo_script(), |_, _, _| parsed += 1)
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.issues);
    assert_eq!(report.lines, 9);
    assert_eq!(parsed, 9);
}
