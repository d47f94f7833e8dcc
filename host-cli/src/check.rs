//! # 脚本检查
//!
//! 静态检查脚本中的指令是否都能在注册表中找到，不执行任何指令。
//!
//! 实体在运行时才被创建，因此 `target.verb` 形式中目标不是子注册表时，
//! 只检查动词是否存在于实体注册表或任一能力绑定的子注册表中。

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use vn_dialogue::{Command, CommandRegistry, DialogueConfig, DialogueLineData, read_script};
use walkdir::WalkDir;

/// 脚本文件扩展名
const SCRIPT_EXTENSION: &str = "txt";

/// 问题种类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// 找不到指令
    UnknownCommand,
    /// 参数少于指令要求
    MissingArguments { expected: usize, actual: usize },
}

/// 一处问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIssue {
    pub file: PathBuf,
    /// 行号（从 1 开始）
    pub line: usize,
    pub command: String,
    pub kind: IssueKind,
}

impl fmt::Display for CheckIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: ", self.file.display(), self.line)?;
        match self.kind {
            IssueKind::UnknownCommand => write!(f, "未知指令 '{}'", self.command),
            IssueKind::MissingArguments { expected, actual } => write!(
                f,
                "指令 '{}' 至少需要 {} 个参数，实际 {} 个",
                self.command, expected, actual
            ),
        }
    }
}

/// 检查报告
#[derive(Debug, Default)]
pub struct CheckReport {
    pub files: usize,
    pub lines: usize,
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// 收集路径下的所有脚本文件（按路径排序）
pub fn collect_scripts(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut scripts: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
        })
        .map(|e| e.into_path())
        .collect();
    scripts.sort();
    scripts
}

/// 脚本检查器
pub struct ScriptChecker<'a, H> {
    registry: &'a CommandRegistry<H>,
    config: &'a DialogueConfig,
}

impl<'a, H> ScriptChecker<'a, H> {
    pub fn new(registry: &'a CommandRegistry<H>, config: &'a DialogueConfig) -> Self {
        Self { registry, config }
    }

    /// 检查文件或目录
    ///
    /// `on_line` 对每个非空行调用一次，用于输出解析结果。
    pub fn check_path(
        &self,
        path: &Path,
        mut on_line: impl FnMut(&Path, usize, &DialogueLineData),
    ) -> Result<CheckReport> {
        let scripts = collect_scripts(path);
        if scripts.is_empty() {
            anyhow::bail!("在 {:?} 下没有找到 .{} 脚本", path, SCRIPT_EXTENSION);
        }

        let mut report = CheckReport::default();
        for script in &scripts {
            // 保留空行，使下标与行号对应
            let lines = read_script(script, true)
                .with_context(|| format!("检查脚本失败: {}", script.display()))?;
            report.files += 1;

            for (index, raw) in lines.iter().enumerate() {
                if raw.trim().is_empty() {
                    continue;
                }
                report.lines += 1;
                let data =
                    DialogueLineData::parse_with_delimiters(raw, &self.config.sub_command_delimiters);
                on_line(script, index + 1, &data);

                for command in data.commands().unwrap_or_default() {
                    if let Some(kind) = self.check_command(command) {
                        report.issues.push(CheckIssue {
                            file: script.clone(),
                            line: index + 1,
                            command: command.name.clone(),
                            kind,
                        });
                    }
                }
            }
            debug!(script = %script.display(), "脚本检查完成");
        }

        info!(
            files = report.files,
            lines = report.lines,
            issues = report.issues.len(),
            "脚本检查结束"
        );
        Ok(report)
    }

    /// 检查单条指令，没有问题时返回 `None`
    pub fn check_command(&self, command: &Command) -> Option<IssueKind> {
        let Some((target, verb)) = self.split_sub_command(&command.name) else {
            return self.check_in(self.registry, &command.name, command.arguments.len());
        };

        if let Some(sub) = self.registry.sub_registry(target) {
            return self.check_in(sub, verb, command.arguments.len());
        }

        // 实体指令：实体名会作为第一个参数插入
        let actual = command.arguments.len() + 1;
        let entity_registry = self.registry.sub_registry(&self.config.entity_registry);
        let capability_registries = self
            .registry
            .capability_bindings()
            .filter_map(|(_, sub)| self.registry.sub_registry(sub));

        entity_registry
            .into_iter()
            .chain(capability_registries)
            .find(|registry| registry.has_command(verb))
            .map_or(Some(IssueKind::UnknownCommand), |registry| {
                self.check_in(registry, verb, actual)
            })
    }

    fn check_in(&self, registry: &CommandRegistry<H>, name: &str, actual: usize) -> Option<IssueKind> {
        let Some(callable) = registry.get_command(name) else {
            return Some(IssueKind::UnknownCommand);
        };
        let expected = callable.min_arity();
        (actual < expected).then_some(IssueKind::MissingArguments { expected, actual })
    }

    /// 与分发器相同的切分规则：最后一个分隔符，两侧都不能为空
    fn split_sub_command<'n>(&self, name: &'n str) -> Option<(&'n str, &'n str)> {
        let (index, delimiter) = name
            .char_indices()
            .rev()
            .find(|(_, c)| self.config.sub_command_delimiters.contains(c))?;
        let target = &name[..index];
        let verb = &name[index + delimiter.len_utf8()..];
        if target.is_empty() || verb.is_empty() {
            return None;
        }
        Some((target, verb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands;
    use std::fs;

    fn check(text: &str) -> CheckReport {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chapter1.txt"), text).unwrap();

        let registry = commands::registry();
        let config = DialogueConfig::default();
        let checker = ScriptChecker::new(&registry, &config);
        checker.check_path(dir.path(), |_, _, _| {}).unwrap()
    }

    #[test]
    fn test_clean_script() {
        let report = check(concat!(
            "createCharacter(Elen -e true)\n",
            "\n",
            "Elen \"你好\" Elen.move(-x 1), [wait]wait(0.5)\n",
            "Elen.setExpression(0:Happy)\n",
            "playbgm(\"Dog Land\" -v 0.5)\n",
        ));
        assert_eq!(report.files, 1);
        assert_eq!(report.lines, 4);
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn test_reports_unknown_and_arity() {
        let report = check(concat!(
            "narrator \"hi\"\n",
            "\n",
            "playMusic(theme), stopsfx()\n",
            "Elen.dance()\n",
        ));
        let lines: Vec<(usize, &str)> = report
            .issues
            .iter()
            .map(|issue| (issue.line, issue.command.as_str()))
            .collect();
        assert_eq!(lines, vec![(3, "playMusic"), (3, "stopsfx"), (4, "Elen.dance")]);
        assert_eq!(
            report.issues[1].kind,
            IssueKind::MissingArguments {
                expected: 1,
                actual: 0
            }
        );
        assert!(report.issues[0].to_string().ends_with(":3: 未知指令 'playMusic'"));
    }

    #[test]
    fn test_sub_registry_commands() {
        let registry = commands::registry();
        let config = DialogueConfig::default();
        let checker = ScriptChecker::new(&registry, &config);

        let command = Command::new("character.move", vec![], false);
        assert_eq!(checker.check_command(&command), None);
        let command = Command::new("character.fly", vec![], false);
        assert_eq!(checker.check_command(&command), Some(IssueKind::UnknownCommand));
    }

    #[test]
    fn test_slash_delimiter_in_script() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chapter1.txt"), "Elen \"hi\" character/move()\n").unwrap();

        let registry = commands::registry();
        let mut config = DialogueConfig::default();
        config.sub_command_delimiters = vec!['.', '/'];
        let checker = ScriptChecker::new(&registry, &config);

        let report = checker.check_path(dir.path(), |_, _, _| {}).unwrap();
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn test_collect_scripts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("chapter2")).unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("chapter2").join("a.TXT"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();

        let scripts = collect_scripts(dir.path());
        assert_eq!(scripts.len(), 2);
        assert!(scripts.iter().all(|p| p.extension().is_some()));

        let single = dir.path().join("b.txt");
        assert_eq!(collect_scripts(&single), vec![single.clone()]);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = commands::registry();
        let config = DialogueConfig::default();
        let checker = ScriptChecker::new(&registry, &config);
        assert!(checker.check_path(dir.path(), |_, _, _| {}).is_err());
    }
}
