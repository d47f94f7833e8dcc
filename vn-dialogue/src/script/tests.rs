//! 行拆分的整体测试

use super::*;

/// (原始行, 说话者, 对话, 指令)
const LINE_CASES: &[(&str, &str, &str, &str)] = &[
    (
        r#"ganyariya "こんにちは。\"人生\"を過ごしています。" SetCli("10" 20)"#,
        "ganyariya",
        r#"こんにちは。"人生"を過ごしています。"#,
        r#"SetCli("10" 20)"#,
    ),
    (
        r#"ganyariya "Hello, World!" playMusic() drawImage(10 40)"#,
        "ganyariya",
        "Hello, World!",
        "playMusic() drawImage(10 40)",
    ),
    ("ganyariya", "ganyariya", "", ""),
    (r#"SetCli("10" 20)"#, "", "", r#"SetCli("10" 20)"#),
    (
        r#"ganyariya "youkoso()" SetCli("10" 20)"#,
        "ganyariya",
        "youkoso()",
        r#"SetCli("10" 20)"#,
    ),
    ("cli()", "", "", "cli()"),
    ("fake cli()", "fake", "", "cli()"),
    ("fake cli()cli()", "fake", "", "cli()cli()"),
    (r#"fake cli()cli("")"#, "fake", "", r#"cli()cli("")"#),
    (r#"fake "hello""#, "fake", "hello", ""),
    (r#"fake "hello()" cli("a")"#, "fake", "hello()", r#"cli("a")"#),
    ("", "", "", ""),
    ("hide", "hide", "", ""),
    (
        r#""並行してBackend(go/gcp)もがんばるぞ""#,
        "",
        "並行してBackend(go/gcp)もがんばるぞ",
        "",
    ),
    (r#"speaker "hello""#, "speaker", "hello", ""),
    (r#"speaker "hello()""#, "speaker", "hello()", ""),
    (r#"speaker "hello()" cli()"#, "speaker", "hello()", "cli()"),
    (r#"speaker "hello()" cli("a")"#, "speaker", "hello()", r#"cli("a")"#),
    (r#"speaker cli("a")"#, "speaker", "", r#"cli("a")"#),
    ("speaker cli(a)", "speaker", "", "cli(a)"),
];

#[test]
fn test_split_raw_line_table() {
    for &(raw, speaker, dialogue, commands) in LINE_CASES {
        let parts = split_raw_line(raw);
        assert_eq!(parts.speaker, speaker, "speaker of: {raw}");
        assert_eq!(parts.dialogue, dialogue, "dialogue of: {raw}");
        assert_eq!(parts.commands, commands, "commands of: {raw}");
    }
}

#[test]
fn test_slash_delimited_command_line() {
    let parts = split_raw_line_with_delimiters(r#"Elen "hi" audio/play(theme)"#, &['.', '/']);
    assert_eq!(parts.speaker, "Elen");
    assert_eq!(parts.dialogue, "hi");
    assert_eq!(parts.commands, "audio/play(theme)");

    let parts = split_raw_line_with_delimiters("audio/play(theme)", &['/']);
    assert_eq!(parts.speaker, "");
    assert_eq!(parts.commands, "audio/play(theme)");

    // 未配置 `/` 时按普通文本处理
    let parts = split_raw_line("audio/play(theme)");
    assert_eq!(parts.speaker, "audio/");
    assert_eq!(parts.commands, "play(theme)");
}

#[test]
fn test_dialogue_only_line() {
    let parts = split_raw_line(r#""""#);
    assert_eq!(parts, RawLineParts::default());
}

#[test]
fn test_escaped_dialogue_round_trip() {
    let dialogues = [
        r#"こんにちは。"人生"を過ごしています。"#,
        r#"C:\path "quoted""#,
        r"a\nb",
        r#""""#,
        "plain",
        r"ends with \",
        r#"lit \" inside"#,
        r"\\",
    ];
    for dialogue in dialogues {
        let quoted = escape_dialogue(dialogue);
        let raw = format!(r#"speaker "{quoted}" cmd()"#);

        let parts = split_raw_line(&raw);
        assert_eq!(parts.speaker, "speaker", "line: {raw}");
        assert_eq!(parts.dialogue, dialogue, "line: {raw}");
        assert_eq!(parts.commands, "cmd()", "line: {raw}");
        assert_eq!(escape_dialogue(&parts.dialogue), quoted);
    }
}

#[test]
fn test_quoted_command_arguments_after_dialogue() {
    let line = DialogueLineData::parse(
        r#"ganyariya "こんにちは。\"人生\"を過ごしています。" SetCli("10", 20)"#,
    );
    let commands = line.commands().unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].name, "SetCli");
    assert_eq!(commands[0].arguments, vec!["10".to_string(), "20".to_string()]);
}

#[test]
fn test_line_snapshot() {
    let line = DialogueLineData::parse(r#"Elen [0:Angle1] at 0.5 "hi{wa 1}!" hide(Elen -i true)"#);
    insta::assert_debug_snapshot!(line, @r#"
    DialogueLineData {
        raw: RawLineParts {
            speaker: "Elen [0:Angle1] at 0.5",
            dialogue: "hi{wa 1}!",
            commands: "hide(Elen -i true)",
        },
        speaker: Some(
            SpeakerData {
                name: "Elen",
                cast_name: "",
                cast_position: CastPosition {
                    x: 0.5,
                    y: 0.0,
                },
                casting_position: true,
                cast_expressions: [
                    CastExpression {
                        layer: 0,
                        expression: "Angle1",
                    },
                ],
            },
        ),
        dialogue: Some(
            [
                DialogueSegment {
                    text: "hi",
                    start_signal: None,
                    signal_delay: 0.0,
                },
                DialogueSegment {
                    text: "!",
                    start_signal: WaitThenAppend,
                    signal_delay: 1.0,
                },
            ],
        ),
        commands: Some(
            [
                Command {
                    name: "hide",
                    arguments: [
                        "Elen",
                        "-i",
                        "true",
                    ],
                    wait_for_completion: false,
                },
            ],
        ),
    }
    "#);
}
