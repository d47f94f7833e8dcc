//! # Stage 模块
//!
//! 终端宿主的舞台状态：角色、音轨与文本框。
//!
//! 没有渲染，所有可见效果都以 [`StageEvent`] 的形式记录下来，由主循环打印。

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};
use vn_dialogue::{CommandHost, DialogueHost, SpeakerData};

/// 角色种类
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CharacterKind {
    /// 立绘角色，支持表情层
    #[default]
    Sprite,
    /// 纯文字角色
    Text,
}

impl CharacterKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sprite" => Some(Self::Sprite),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// 该种类具备的能力标签
    pub fn capabilities(self) -> &'static [&'static str] {
        match self {
            Self::Sprite => &["sprite"],
            Self::Text => &[],
        }
    }
}

/// 角色状态
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub kind: CharacterKind,
    pub enabled: bool,
    pub visible: bool,
    pub position: (f32, f32),
    /// 图层 → 表情名
    pub expressions: BTreeMap<i32, String>,
}

impl Character {
    pub fn new(kind: CharacterKind) -> Self {
        Self {
            kind,
            enabled: true,
            visible: false,
            position: (0.0, 0.0),
            expressions: BTreeMap::new(),
        }
    }
}

/// 音轨
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub volume: f32,
    pub pitch: f32,
    pub looping: bool,
}

/// 舞台事件
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    /// 说话者变化，`None` 表示旁白
    Speaker(Option<String>),
    /// 一段文本构建完成
    Text { text: String, append: bool },
    /// 指令产生的效果描述
    Effect(String),
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Speaker(Some(name)) => write!(f, "【{name}】"),
            Self::Speaker(None) => write!(f, "【旁白】"),
            Self::Text { text, append: true } => write!(f, "  …{text}"),
            Self::Text { text, append: false } => write!(f, "  {text}"),
            Self::Effect(description) => write!(f, "  * {description}"),
        }
    }
}

/// 文本框：按字符逐步显示
#[derive(Debug, Clone, Default)]
struct TextBox {
    pending: String,
    append: bool,
    shown: f32,
    total: usize,
    speed_multiplier: f32,
}

impl TextBox {
    fn is_building(&self) -> bool {
        (self.shown as usize) < self.total
    }
}

/// 终端舞台
#[derive(Debug)]
pub struct Stage {
    characters: BTreeMap<String, Character>,
    bgm: Option<Track>,
    sfx: Vec<Track>,
    text: TextBox,
    /// 每秒显示的字符数，0 表示立即显示
    text_speed: f32,
    events: Vec<StageEvent>,
}

/// 第一次跳过时的加速倍率
const HURRY_MULTIPLIER: f32 = 4.0;

impl Stage {
    pub fn new(text_speed: f32) -> Self {
        Self {
            characters: BTreeMap::new(),
            bgm: None,
            sfx: Vec::new(),
            text: TextBox::default(),
            text_speed,
            events: Vec::new(),
        }
    }

    /// 推进文本构建
    pub fn update(&mut self, delta: f32) {
        if !self.text.is_building() {
            return;
        }
        self.text.shown += delta * self.text_speed * self.text.speed_multiplier;
        if !self.text.is_building() {
            self.finish_text();
        }
    }

    /// 取出并清空累积的事件
    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn record(&mut self, description: impl Into<String>) {
        let description = description.into();
        debug!(effect = %description, "舞台效果");
        self.events.push(StageEvent::Effect(description));
    }

    // ── 角色 ──

    /// 创建角色，同名角色已存在时返回 `false`
    pub fn create_character(&mut self, name: &str, kind: CharacterKind) -> bool {
        if self.characters.contains_key(name) {
            warn!(name, "角色已存在");
            return false;
        }
        self.characters.insert(name.to_string(), Character::new(kind));
        true
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.get(name)
    }

    pub fn character_mut(&mut self, name: &str) -> Option<&mut Character> {
        self.characters.get_mut(name)
    }

    pub fn character_names(&self) -> impl Iterator<Item = &str> {
        self.characters.keys().map(String::as_str)
    }

    // ── 音频 ──

    pub fn bgm(&self) -> Option<&Track> {
        self.bgm.as_ref()
    }

    pub fn set_bgm(&mut self, track: Option<Track>) {
        self.bgm = track;
    }

    pub fn sfx(&self) -> &[Track] {
        &self.sfx
    }

    pub fn play_sfx(&mut self, track: Track) {
        self.sfx.push(track);
    }

    /// 停止同名音效，返回停止的数量
    pub fn stop_sfx(&mut self, name: &str) -> usize {
        let before = self.sfx.len();
        self.sfx.retain(|track| track.name != name);
        before - self.sfx.len()
    }

    pub fn stop_all_sfx(&mut self) -> usize {
        std::mem::take(&mut self.sfx).len()
    }

    fn finish_text(&mut self) {
        self.text.shown = self.text.total as f32;
        let text = std::mem::take(&mut self.text.pending);
        self.events.push(StageEvent::Text {
            text,
            append: self.text.append,
        });
    }
}

impl CommandHost for Stage {
    type Entity = CharacterKind;

    fn resolve_entity(&self, name: &str) -> Option<CharacterKind> {
        self.characters.get(name).map(|character| character.kind)
    }

    fn entity_has_capability(&self, entity: &CharacterKind, capability: &str) -> bool {
        entity.capabilities().contains(&capability)
    }
}

impl DialogueHost for Stage {
    fn show_speaker(&mut self, speaker: Option<&SpeakerData>) {
        let Some(speaker) = speaker else {
            self.events.push(StageEvent::Speaker(None));
            return;
        };

        // cast 覆盖作用于已创建的角色
        if let Some(character) = self.characters.get_mut(&speaker.name) {
            if speaker.is_casting_position() {
                character.position = (speaker.cast_position.x, speaker.cast_position.y);
            }
            for cast in &speaker.cast_expressions {
                character
                    .expressions
                    .insert(cast.layer, cast.expression.clone());
            }
        }

        self.events
            .push(StageEvent::Speaker(Some(speaker.display_name().to_string())));
    }

    fn build_text(&mut self, text: &str, append: bool) {
        let total = text.chars().count();
        self.text = TextBox {
            pending: text.to_string(),
            append,
            shown: 0.0,
            total,
            speed_multiplier: 1.0,
        };
        if self.text_speed <= 0.0 || total == 0 {
            self.finish_text();
        }
    }

    fn is_building(&self) -> bool {
        self.text.is_building()
    }

    fn hurry_up(&mut self) {
        self.text.speed_multiplier = HURRY_MULTIPLIER;
    }

    fn force_complete(&mut self) {
        if self.text.is_building() {
            self.finish_text();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_builds_over_time() {
        let mut stage = Stage::new(10.0);
        stage.build_text("你好世界", false);
        assert!(stage.is_building());

        stage.update(0.2);
        assert!(stage.is_building());
        assert!(stage.drain_events().is_empty());

        stage.update(0.2);
        assert!(!stage.is_building());
        assert_eq!(
            stage.drain_events(),
            vec![StageEvent::Text {
                text: "你好世界".to_string(),
                append: false
            }]
        );
    }

    #[test]
    fn test_instant_text() {
        let mut stage = Stage::new(0.0);
        stage.build_text("hello", true);
        assert!(!stage.is_building());
        assert_eq!(stage.drain_events().len(), 1);
    }

    #[test]
    fn test_hurry_and_force_complete() {
        let mut stage = Stage::new(10.0);
        stage.build_text("0123456789", false);
        stage.hurry_up();
        stage.update(0.1);
        assert!(stage.is_building());

        stage.force_complete();
        assert!(!stage.is_building());
        // 已完成后再次强制完成不产生重复事件
        stage.force_complete();
        assert_eq!(stage.drain_events().len(), 1);
    }

    #[test]
    fn test_speaker_cast_applies_to_character() {
        let mut stage = Stage::new(0.0);
        stage.create_character("Elen", CharacterKind::Sprite);

        let speaker = SpeakerData::parse("Elen [0:Happy] as ??? at 0.5:1");
        stage.show_speaker(Some(&speaker));

        let elen = stage.character("Elen").unwrap();
        assert_eq!(elen.position, (0.5, 1.0));
        assert_eq!(elen.expressions.get(&0).map(String::as_str), Some("Happy"));
        assert_eq!(
            stage.drain_events(),
            vec![StageEvent::Speaker(Some("???".to_string()))]
        );
    }

    #[test]
    fn test_entity_capabilities() {
        let mut stage = Stage::new(0.0);
        stage.create_character("Elen", CharacterKind::Sprite);
        stage.create_character("Narrator", CharacterKind::Text);
        assert!(!stage.create_character("Elen", CharacterKind::Text));

        let elen = stage.resolve_entity("Elen").unwrap();
        let narrator = stage.resolve_entity("Narrator").unwrap();
        assert!(stage.entity_has_capability(&elen, "sprite"));
        assert!(!stage.entity_has_capability(&narrator, "sprite"));
        assert!(stage.resolve_entity("Nobody").is_none());
    }

    #[test]
    fn test_sfx_tracks() {
        let mut stage = Stage::new(0.0);
        let track = |name: &str| Track {
            name: name.to_string(),
            volume: 1.0,
            pitch: 1.0,
            looping: false,
        };
        stage.play_sfx(track("door"));
        stage.play_sfx(track("door"));
        stage.play_sfx(track("rain"));
        assert_eq!(stage.stop_sfx("door"), 2);
        assert_eq!(stage.stop_all_sfx(), 1);
        assert!(stage.sfx().is_empty());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(StageEvent::Speaker(None).to_string(), "【旁白】");
        assert_eq!(
            StageEvent::Effect("show Elen".to_string()).to_string(),
            "  * show Elen"
        );
    }
}
