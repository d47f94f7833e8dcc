//! # Config 模块
//!
//! 对话运行时的配置。缺失的字段取默认值，因此空的 JSON 对象 `{}` 也是合法配置。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// 对话运行时配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// 实体指令优先查找的子注册表
    #[serde(default = "default_entity_registry")]
    pub entity_registry: String,

    /// 子指令分隔符，以最后一个出现的分隔符切分
    #[serde(default = "default_sub_command_delimiters")]
    pub sub_command_delimiters: Vec<char>,

    /// 文本构建中的两段式跳过：第一次推进加速，第二次直接完成
    ///
    /// 关闭时第一次推进即直接完成。
    #[serde(default = "default_two_stage_skip")]
    pub two_stage_skip: bool,

    /// 读取脚本时是否保留空行
    #[serde(default)]
    pub include_blank_lines: bool,
}

fn default_entity_registry() -> String {
    "character".to_string()
}

fn default_sub_command_delimiters() -> Vec<char> {
    vec!['.']
}

fn default_two_stage_skip() -> bool {
    true
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            entity_registry: default_entity_registry(),
            sub_command_delimiters: default_sub_command_delimiters(),
            two_stage_skip: default_two_stage_skip(),
            include_blank_lines: false,
        }
    }
}

impl DialogueConfig {
    /// 从 JSON 文本解析并验证
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载并验证
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content)?;
        debug!(path = %path.display(), "对话配置已加载");
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entity_registry.trim().is_empty() {
            return Err(ConfigError::Invalid("entity_registry 不能为空".to_string()));
        }
        if let Some(c) = self
            .sub_command_delimiters
            .iter()
            .find(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '(' | ')' | '"'))
        {
            return Err(ConfigError::Invalid(format!(
                "子指令分隔符不能是 {c:?}"
            )));
        }
        Ok(())
    }
}
