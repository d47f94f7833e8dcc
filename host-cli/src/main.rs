//! # VN Host
//!
//! 终端宿主：在命令行中播放对话脚本，或静态检查脚本中的指令。
//!
//! ## 用法
//!
//! ```bash
//! # 播放脚本，回车推进
//! cargo run -p host-cli -- run scripts/chapter1.txt
//!
//! # 自动推进，每个 tick 0.05 秒
//! vn-host run scripts/chapter1.txt --auto-advance --tick 0.05
//!
//! # 检查目录下的所有脚本，并以 JSON 输出每行的解析结果
//! vn-host check scripts --json
//! ```

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use vn_dialogue::{ConversationInput, ConversationStatus, DialogueRuntime};

use host_cli::check::ScriptChecker;
use host_cli::commands;
use host_cli::config::{AppConfig, CliOverrides};
use host_cli::stage::Stage;

#[derive(Parser)]
#[command(name = "vn-host")]
#[command(about = "对话脚本终端宿主 - 播放或检查脚本")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：config.json）
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// 日志级别，覆盖配置文件
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 播放脚本
    Run {
        /// 脚本路径，未指定时使用配置中的 script_path
        script: Option<PathBuf>,

        /// 每个 tick 的时间增量（秒）
        #[arg(long)]
        tick: Option<f32>,

        /// 自动推进，不等待回车
        #[arg(long)]
        auto_advance: bool,

        /// tick 上限
        #[arg(long)]
        max_ticks: Option<u64>,

        /// 文本显示速度（字 / 秒），0 表示立即显示
        #[arg(long)]
        text_speed: Option<f32>,
    },

    /// 检查脚本中的指令
    Check {
        /// 脚本文件或目录
        path: PathBuf,

        /// 以 JSON 输出每行的解析结果
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut overrides = CliOverrides {
        log_level: cli.log_level,
        ..CliOverrides::default()
    };
    if let Commands::Run {
        script,
        tick,
        auto_advance,
        max_ticks,
        text_speed,
    } = &cli.command
    {
        overrides.script_path = script.clone();
        overrides.tick_seconds = *tick;
        overrides.auto_advance = *auto_advance;
        overrides.max_ticks = *max_ticks;
        overrides.text_speed = *text_speed;
    }

    let config = AppConfig::load(&cli.config).merge(overrides);
    config.validate().context("配置无效")?;
    init_tracing(&config);

    match &cli.command {
        Commands::Run { .. } => run(&config),
        Commands::Check { path, json } => check(&config, path, *json),
    }
}

fn init_tracing(config: &AppConfig) {
    let level = config.level().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// 播放脚本直到结束或达到 tick 上限
fn run(config: &AppConfig) -> Result<()> {
    let script = config
        .script_path
        .as_ref()
        .context("未指定脚本：请在命令行或配置文件的 script_path 中指定")?;

    let mut stage = Stage::new(config.text_speed);
    let mut runtime = DialogueRuntime::with_config(commands::registry(), config.dialogue.clone());
    runtime.load_script(script)?;

    let mut auto_advance = config.auto_advance;
    let mut input = None;
    let stdin = io::stdin();

    for tick in 0..config.max_ticks {
        stage.update(config.tick_seconds);
        let status = runtime.tick(&mut stage, input.take(), config.tick_seconds);
        for event in stage.drain_events() {
            println!("{event}");
        }

        match status {
            ConversationStatus::Finished if runtime.dispatcher().active_count() == 0 => {
                info!(ticks = tick + 1, "脚本播放完毕");
                return Ok(());
            }
            ConversationStatus::WaitForAdvance => {
                if !auto_advance {
                    let mut line = String::new();
                    if stdin.lock().read_line(&mut line)? == 0 {
                        // 输入已关闭，余下部分自动推进
                        auto_advance = true;
                    } else if line.trim().eq_ignore_ascii_case("q") {
                        runtime.stop_conversation();
                        runtime.dispatcher_mut().stop_all(&mut stage);
                        info!("已退出");
                        return Ok(());
                    }
                }
                input = Some(ConversationInput::Advance);
            }
            _ => {}
        }
    }

    warn!(max_ticks = config.max_ticks, "达到 tick 上限，停止播放");
    runtime.dispatcher_mut().stop_all(&mut stage);
    Ok(())
}

/// 检查脚本，发现问题时返回错误
fn check(config: &AppConfig, path: &Path, json: bool) -> Result<()> {
    let registry = commands::registry();
    let checker = ScriptChecker::new(&registry, &config.dialogue);

    let report = checker.check_path(path, |file, line, data| {
        if !json {
            return;
        }
        match serde_json::to_string(data) {
            Ok(encoded) => println!("{}:{}\t{}", file.display(), line, encoded),
            Err(e) => warn!(error = %e, "无法序列化行数据"),
        }
    })?;

    for issue in &report.issues {
        eprintln!("{issue}");
    }

    if !report.is_clean() {
        anyhow::bail!("发现 {} 处问题", report.issues.len());
    }
    println!("✅ {} 个脚本、{} 行，未发现问题", report.files, report.lines);
    Ok(())
}
