//! # Config 模块
//!
//! 终端宿主的配置管理。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::Level;
use vn_dialogue::{ConfigError, DialogueConfig};

/// 宿主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 入口脚本路径，可由命令行覆盖
    #[serde(default)]
    pub script_path: Option<PathBuf>,

    /// 每个 tick 的时间增量（秒）
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f32,

    /// 自动推进：等待玩家时直接推进，不读取终端输入
    #[serde(default)]
    pub auto_advance: bool,

    /// tick 上限，防止脚本中的长等待使进程挂起
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// 日志级别（trace / debug / info / warn / error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 文本显示速度（字 / 秒），0 表示立即显示
    #[serde(default = "default_text_speed")]
    pub text_speed: f32,

    /// 对话运行时配置
    #[serde(default)]
    pub dialogue: DialogueConfig,
}

fn default_tick_seconds() -> f32 {
    1.0 / 60.0
}

fn default_max_ticks() -> u64 {
    100_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_text_speed() -> f32 {
    40.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            script_path: None,
            tick_seconds: default_tick_seconds(),
            auto_advance: false,
            max_ticks: default_max_ticks(),
            log_level: default_log_level(),
            text_speed: default_text_speed(),
            dialogue: DialogueConfig::default(),
        }
    }
}

/// 命令行覆盖项，`None` / `false` 表示不覆盖
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub script_path: Option<PathBuf>,
    pub tick_seconds: Option<f32>,
    pub auto_advance: bool,
    pub max_ticks: Option<u64>,
    pub log_level: Option<String>,
    pub text_speed: Option<f32>,
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并打印警告。
    /// 此时日志尚未初始化（日志级别本身来自配置），因此直接输出到 stderr。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            eprintln!("⚠️ 配置文件不存在: {:?}，使用默认配置", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("⚠️ 配置文件解析失败: {}，使用默认配置", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("⚠️ 配置文件读取失败: {}，使用默认配置", e);
                Self::default()
            }
        }
    }

    /// 应用命令行覆盖
    pub fn merge(mut self, overrides: CliOverrides) -> Self {
        if let Some(script_path) = overrides.script_path {
            self.script_path = Some(script_path);
        }
        if let Some(tick_seconds) = overrides.tick_seconds {
            self.tick_seconds = tick_seconds;
        }
        if overrides.auto_advance {
            self.auto_advance = true;
        }
        if let Some(max_ticks) = overrides.max_ticks {
            self.max_ticks = max_ticks;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        if let Some(text_speed) = overrides.text_speed {
            self.text_speed = text_speed;
        }
        self
    }

    /// 日志级别，无法识别时返回 `None`
    pub fn level(&self) -> Option<Level> {
        self.log_level.parse().ok()
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_seconds.is_finite() && self.tick_seconds > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tick_seconds 必须为正数，实际 {}",
                self.tick_seconds
            )));
        }

        if self.max_ticks == 0 {
            return Err(ConfigError::Invalid("max_ticks 不能为 0".to_string()));
        }

        if !(self.text_speed.is_finite() && self.text_speed >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "text_speed 不能为负数，实际 {}",
                self.text_speed
            )));
        }

        if self.level().is_none() {
            return Err(ConfigError::Invalid(format!(
                "无法识别的日志级别 '{}'",
                self.log_level
            )));
        }

        self.dialogue.validate()
    }
}
