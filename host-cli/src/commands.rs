//! # 宿主指令
//!
//! 终端舞台提供的注册单元：
//!
//! - [`character`]：角色的创建、显示、隐藏，以及实体指令 `name.move` / `name.show` / `name.hide`
//! - [`sprite`]：立绘角色专有的实体指令 `name.setExpression`
//! - [`audio`]：BGM 与音效
//!
//! 过渡效果（淡入、移动）以序列实现；被跳过时通过终止回调直接设为终值。

use tracing::warn;
use vn_dialogue::{
    CommandContext, CommandError, CommandParameterFetcher, CommandRegistry, CommandResult,
    CommandSequence, FnSequence, Step, WaitSeconds,
};

use crate::stage::{CharacterKind, Stage, Track};

const IMMEDIATE_PARAMS: &[&str] = &["-i", "-immediate"];
const ENABLE_PARAMS: &[&str] = &["-e", "-enabled"];
const KIND_PARAMS: &[&str] = &["-k", "-kind"];
const SPEED_PARAMS: &[&str] = &["-spd", "-speed"];
const X_PARAMS: &[&str] = &["-x"];
const Y_PARAMS: &[&str] = &["-y"];

const VOLUME_PARAMS: &[&str] = &["-v", "-volume"];
const PITCH_PARAMS: &[&str] = &["-p", "-pitch"];
const LOOP_PARAMS: &[&str] = &["-l", "-loop"];

/// 显示 / 隐藏过渡的时长（秒）
const FADE_SECONDS: f32 = 0.5;
/// 默认移动速度（单位 / 秒）
const DEFAULT_MOVE_SPEED: f32 = 1.0;

/// 注册表名，实体指令由分发器按 `character` 查找
pub const CHARACTER_REGISTRY: &str = "character";
pub const SPRITE_REGISTRY: &str = "sprite";

/// 完整的宿主注册表
pub fn registry() -> CommandRegistry<Stage> {
    CommandRegistry::with_units(&[vn_dialogue::builtin::general, character, sprite, audio])
}

// ── 角色 ──

/// 角色指令
pub fn character(registry: &mut CommandRegistry<Stage>) {
    registry.add_action_with_args("createCharacter", |ctx, args| {
        let name = first_arg(ctx, args)?;
        let params = CommandParameterFetcher::with_start_index(args, 1);
        let kind = match params.try_get::<String>(KIND_PARAMS) {
            Some(raw) => CharacterKind::parse(&raw).ok_or_else(|| {
                CommandError::invalid_argument(ctx.command_name(), format!("未知角色种类 '{raw}'"))
            })?,
            None => CharacterKind::default(),
        };
        let enabled = params.get_or(ENABLE_PARAMS, false);

        let stage = ctx.host();
        if !stage.create_character(&name, kind) {
            return Ok(());
        }
        if let Some(character) = stage.character_mut(&name) {
            character.enabled = enabled;
            character.visible = enabled;
        }
        stage.record(format!("create {name} ({kind:?})"));
        Ok(())
    });

    registry.add_sequence("showCharacters", |ctx, args| {
        set_visibility(ctx, args, true)
    });
    registry.add_sequence("hideCharacters", |ctx, args| {
        set_visibility(ctx, args, false)
    });

    let entity = registry.create_sub_registry(CHARACTER_REGISTRY);
    // 实体指令的第一个参数是实体名
    entity.add_sequence("show", |ctx, args| set_visibility(ctx, args, true));
    entity.add_sequence("hide", |ctx, args| set_visibility(ctx, args, false));
    entity.add_sequence("move", move_character);
}

/// 显示或隐藏一组角色
///
/// 参数中第一个 flag 之前的都是角色名；不存在的角色会被跳过。
fn set_visibility(
    ctx: &mut CommandContext<'_, Stage>,
    args: &[String],
    visible: bool,
) -> CommandResult<Box<dyn CommandSequence<Stage>>> {
    let names: Vec<String> = args
        .iter()
        .take_while(|arg| !arg.starts_with('-'))
        .cloned()
        .collect();
    let params = CommandParameterFetcher::with_start_index(args, names.len());
    let immediate = params.get_or(IMMEDIATE_PARAMS, false);

    let stage = ctx.host();
    let names: Vec<String> = names
        .into_iter()
        .filter(|name| {
            let exists = stage.character(name).is_some();
            if !exists {
                warn!(name = %name, "角色不存在，已跳过");
            }
            exists
        })
        .collect();

    let verb = if visible { "show" } else { "hide" };
    stage.record(format!("{verb} {}", names.join(" ")));

    // 过渡被跳过时同样落到终态
    ctx.on_terminate(move |stage: &mut Stage| {
        for name in &names {
            if let Some(character) = stage.character_mut(name) {
                character.visible = visible;
            }
        }
    });

    let seconds = if immediate { 0.0 } else { FADE_SECONDS };
    Ok(Box::new(WaitSeconds::new(seconds)))
}

/// `name.move(-x 1 -y 0 -speed 2 -i false)`
fn move_character(
    ctx: &mut CommandContext<'_, Stage>,
    args: &[String],
) -> CommandResult<Box<dyn CommandSequence<Stage>>> {
    let name = first_arg(ctx, args)?;
    let params = CommandParameterFetcher::with_start_index(args, 1);

    let Some(start) = ctx.host_ref().character(&name).map(|c| c.position) else {
        return Err(CommandError::failed(ctx.command_name(), format!("角色 '{name}' 不存在")));
    };
    let target = (
        params.get_or(X_PARAMS, start.0),
        params.get_or(Y_PARAMS, start.1),
    );
    let speed = params.get_or(SPEED_PARAMS, DEFAULT_MOVE_SPEED);
    let immediate = params.get_or(IMMEDIATE_PARAMS, false) || speed <= 0.0;

    ctx.host()
        .record(format!("move {name} -> ({}, {})", target.0, target.1));

    let snap_name = name.clone();
    ctx.on_terminate(move |stage: &mut Stage| {
        if let Some(character) = stage.character_mut(&snap_name) {
            character.position = target;
        }
    });

    if immediate {
        return Ok(Box::new(WaitSeconds::new(0.0)));
    }

    let sequence = FnSequence::new(move |ctx: &mut CommandContext<'_, Stage>| {
        let delta = ctx.delta();
        let Some(character) = ctx.host().character_mut(&name) else {
            return Step::Done;
        };
        let (x, y) = character.position;
        let (dx, dy) = (target.0 - x, target.1 - y);
        let distance = (dx * dx + dy * dy).sqrt();
        let step = speed * delta;
        if distance <= step {
            character.position = target;
            return Step::Done;
        }
        character.position = (x + dx / distance * step, y + dy / distance * step);
        Step::Yield
    });
    Ok(Box::new(sequence))
}

// ── 立绘 ──

/// 立绘角色专有的实体指令，通过 `sprite` 能力路由
pub fn sprite(registry: &mut CommandRegistry<Stage>) {
    let sprite = registry.create_sub_registry(SPRITE_REGISTRY);
    // name.setExpression(0:Happy 1:Sad)
    sprite.add_action_with_args("setExpression", |ctx, args| {
        let name = first_arg(ctx, args)?;
        let mut layers = Vec::new();
        for item in &args[1..] {
            let parsed = item
                .split_once(':')
                .and_then(|(layer, expr)| Some((layer.trim().parse::<i32>().ok()?, expr.trim())));
            match parsed {
                Some((layer, expr)) => layers.push((layer, expr.to_string())),
                None => {
                    return Err(CommandError::invalid_argument(
                        ctx.command_name(),
                        format!("表情层格式应为 layer:expression，实际 '{item}'"),
                    ));
                }
            }
        }

        let stage = ctx.host();
        if let Some(character) = stage.character_mut(&name) {
            character.expressions.extend(layers);
        }
        stage.record(format!("expression {name} {}", args[1..].join(" ")));
        Ok(())
    });
    registry.bind_capability("sprite", SPRITE_REGISTRY);
}

// ── 音频 ──

/// 音频指令
pub fn audio(registry: &mut CommandRegistry<Stage>) {
    registry.add_action_with_args("playbgm", |ctx, args| {
        let track = read_track(ctx, args, true)?;
        let stage = ctx.host();
        stage.record(format!("bgm {} (volume {})", track.name, track.volume));
        stage.set_bgm(Some(track));
        Ok(())
    });

    registry.add_action("stopbgm", |ctx| {
        let stage = ctx.host();
        if let Some(track) = stage.bgm() {
            let description = format!("stop bgm {}", track.name);
            stage.record(description);
        }
        stage.set_bgm(None);
        Ok(())
    });

    registry.add_action_with_args("playsfx", |ctx, args| {
        let track = read_track(ctx, args, false)?;
        let stage = ctx.host();
        stage.record(format!("sfx {}", track.name));
        stage.play_sfx(track);
        Ok(())
    });

    registry.add_action_with_arg("stopsfx", |ctx, name| {
        let stage = ctx.host();
        let stopped = if name == "*" {
            stage.stop_all_sfx()
        } else {
            stage.stop_sfx(name)
        };
        stage.record(format!("stop sfx {name} ({stopped})"));
        Ok(())
    });
}

/// `playbgm(name -v 0.8 -p 1 -l true)`
fn read_track(
    ctx: &CommandContext<'_, Stage>,
    args: &[String],
    default_loop: bool,
) -> CommandResult<Track> {
    let name = first_arg(ctx, args)?;
    let params = CommandParameterFetcher::with_start_index(args, 1);
    let volume = params.get_or(VOLUME_PARAMS, 1.0_f32);
    if !(0.0..=1.0).contains(&volume) {
        return Err(CommandError::invalid_argument(
            ctx.command_name(),
            format!("音量必须在 0.0 - 1.0 之间，实际 {volume}"),
        ));
    }
    Ok(Track {
        name,
        volume,
        pitch: params.get_or(PITCH_PARAMS, 1.0_f32),
        looping: params.get_or(LOOP_PARAMS, default_loop),
    })
}

fn first_arg(ctx: &CommandContext<'_, Stage>, args: &[String]) -> CommandResult<String> {
    match args.first() {
        Some(first) if !first.starts_with('-') => Ok(first.clone()),
        _ => Err(CommandError::invalid_argument(
            ctx.command_name(),
            "缺少名字参数",
        )),
    }
}
