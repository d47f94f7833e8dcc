//! # 说话者解析
//!
//! 解析说话者文本中的 cast 语法：
//!
//! ```text
//! ganyariya [0:Happy,1:Sad] as ??? at 1:0.8
//! └ name ─┘└ expressions ─┘   └┬┘    └┬──┘
//!                          显示名   位置
//! ```
//!
//! 标记按出现顺序从左到右识别，每个标记的内容延伸到下一个标记（或行尾）之前。

use serde::{Deserialize, Serialize};
use tracing::warn;

const NAME_CAST_MARKER: &str = " as ";
const POSITION_CAST_MARKER: &str = " at ";
const EXPRESSION_CAST_MARKER: &str = " [";
const POSITION_AXIS_DELIMITER: char = ':';
const EXPRESSION_LAYER_JOINER: char = ',';
const EXPRESSION_LAYER_DELIMITER: char = ':';

/// 屏幕位置覆盖（`at x:y`）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CastPosition {
    pub x: f32,
    pub y: f32,
}

impl CastPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 表情层覆盖（`[layer:expression]` 中的一项）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastExpression {
    /// 图层索引
    pub layer: i32,
    /// 表情名
    pub expression: String,
}

impl CastExpression {
    pub fn new(layer: i32, expression: impl Into<String>) -> Self {
        Self {
            layer,
            expression: expression.into(),
        }
    }
}

/// 说话者数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerData {
    /// 角色名（第一个 cast 标记之前的文本）
    pub name: String,
    /// 显示名覆盖，空字符串表示不覆盖
    pub cast_name: String,
    /// 位置覆盖，未指定时为 (0, 0)
    pub cast_position: CastPosition,
    /// 是否显式指定了位置
    pub casting_position: bool,
    /// 表情层覆盖，保持书写顺序
    pub cast_expressions: Vec<CastExpression>,
}

/// 标记种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Name,
    Position,
    Expression,
}

impl Marker {
    const ALL: [Marker; 3] = [Marker::Name, Marker::Position, Marker::Expression];

    fn text(self) -> &'static str {
        match self {
            Marker::Name => NAME_CAST_MARKER,
            Marker::Position => POSITION_CAST_MARKER,
            Marker::Expression => EXPRESSION_CAST_MARKER,
        }
    }
}

impl SpeakerData {
    /// 解析说话者原始文本
    pub fn parse(raw: &str) -> Self {
        let markers = find_markers(raw);

        let Some(&(first, _)) = markers.first() else {
            return Self {
                name: raw.to_string(),
                ..Self::default()
            };
        };

        let mut data = Self {
            name: raw[..first].to_string(),
            ..Self::default()
        };

        for (i, &(index, marker)) in markers.iter().enumerate() {
            let payload_start = index + marker.text().len();
            let payload_end = markers.get(i + 1).map_or(raw.len(), |&(next, _)| next);
            let payload = &raw[payload_start..payload_end];

            match marker {
                Marker::Name => data.cast_name = payload.to_string(),
                Marker::Position => {
                    data.cast_position = parse_position(payload);
                    data.casting_position = true;
                }
                Marker::Expression => data.cast_expressions = parse_expressions(payload),
            }
        }

        data
    }

    /// 画面上显示的名字：有显示名覆盖时使用覆盖，否则使用角色名
    pub fn display_name(&self) -> &str {
        if self.cast_name.is_empty() {
            &self.name
        } else {
            &self.cast_name
        }
    }

    pub fn is_casting_name(&self) -> bool {
        !self.cast_name.is_empty()
    }

    pub fn is_casting_position(&self) -> bool {
        self.casting_position
    }

    pub fn is_casting_expressions(&self) -> bool {
        !self.cast_expressions.is_empty()
    }
}

/// 从左到右扫描标记，命中后跳过标记本身，不重叠
fn find_markers(raw: &str) -> Vec<(usize, Marker)> {
    let mut markers = Vec::new();
    let mut i = 0;

    while i < raw.len() {
        let rest = &raw[i..];
        if let Some(marker) = Marker::ALL.into_iter().find(|m| rest.starts_with(m.text())) {
            markers.push((i, marker));
            i += marker.text().len();
            continue;
        }
        i += rest.chars().next().map_or(1, char::len_utf8);
    }

    markers
}

/// 解析 `x:y`，`y` 可省略；逗号视同冒号。无法解析的坐标取 0
fn parse_position(payload: &str) -> CastPosition {
    let normalized = payload.replace(',', ":");
    let mut axes = normalized
        .split(POSITION_AXIS_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut axis = |label: &str| -> f32 {
        match axes.next() {
            Some(value) => value.parse().unwrap_or_else(|_| {
                warn!(axis = label, value, "无法解析的位置坐标，使用 0");
                0.0
            }),
            None => 0.0,
        }
    };

    let x = axis("x");
    let y = axis("y");
    CastPosition::new(x, y)
}

/// 解析 `layer:expr,layer:expr`，闭合的 `]` 可省略
fn parse_expressions(payload: &str) -> Vec<CastExpression> {
    let trimmed = payload.trim();
    let body = trimmed.strip_suffix(']').unwrap_or(trimmed);

    body.split(EXPRESSION_LAYER_JOINER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|item| {
            let parsed = item
                .split_once(EXPRESSION_LAYER_DELIMITER)
                .and_then(|(layer, expr)| {
                    let layer = layer.trim().parse::<i32>().ok()?;
                    Some(CastExpression::new(layer, expr.trim()))
                });
            if parsed.is_none() {
                warn!(item, "无法解析的表情层，已跳过");
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        let data = SpeakerData::parse("ganyariya");
        assert_eq!(data.name, "ganyariya");
        assert_eq!(data.cast_name, "");
        assert_eq!(data.cast_position, CastPosition::default());
        assert!(data.cast_expressions.is_empty());
        assert_eq!(data.display_name(), "ganyariya");
        assert!(!data.is_casting_position());
    }

    #[test]
    fn test_cast_name() {
        let data = SpeakerData::parse("ganyariya as ???");
        assert_eq!(data.name, "ganyariya");
        assert_eq!(data.cast_name, "???");
        assert_eq!(data.display_name(), "???");
        assert!(data.is_casting_name());
    }

    #[test]
    fn test_cast_name_and_position() {
        let data = SpeakerData::parse("ganyariya as ??? at 1:0.8");
        assert_eq!(data.name, "ganyariya");
        assert_eq!(data.cast_name, "???");
        assert_eq!(data.cast_position, CastPosition::new(1.0, 0.8));
        assert!(data.is_casting_position());
    }

    #[test]
    fn test_expressions_first() {
        let data = SpeakerData::parse("ganyariya [0:Happy,1:Sad] as ??? at 1:0.8");
        assert_eq!(data.name, "ganyariya");
        assert_eq!(data.cast_name, "???");
        assert_eq!(data.cast_position, CastPosition::new(1.0, 0.8));
        assert_eq!(
            data.cast_expressions,
            vec![CastExpression::new(0, "Happy"), CastExpression::new(1, "Sad")]
        );
    }

    #[test]
    fn test_expressions_last_without_bracket() {
        let data = SpeakerData::parse("Elen at 0.5 [0:Angle1, 1:High");
        assert_eq!(data.name, "Elen");
        assert_eq!(data.cast_position, CastPosition::new(0.5, 0.0));
        assert_eq!(
            data.cast_expressions,
            vec![
                CastExpression::new(0, "Angle1"),
                CastExpression::new(1, "High")
            ]
        );
    }

    #[test]
    fn test_position_variants() {
        assert_eq!(parse_position("1,0.8"), CastPosition::new(1.0, 0.8));
        assert_eq!(parse_position("-0.5"), CastPosition::new(-0.5, 0.0));
        assert_eq!(parse_position("abc:2"), CastPosition::new(0.0, 2.0));
        assert_eq!(parse_position(""), CastPosition::default());
    }

    #[test]
    fn test_malformed_expression_is_skipped() {
        let data = SpeakerData::parse("Elen [x:Happy,Sad,2:Angry]");
        assert_eq!(data.cast_expressions, vec![CastExpression::new(2, "Angry")]);
    }

    #[test]
    fn test_marker_needs_surrounding_spaces() {
        // "Atlas" / "as" 开头的名字不应被误判
        let data = SpeakerData::parse("Atlas");
        assert_eq!(data.name, "Atlas");
        let data = SpeakerData::parse("Basil at2");
        assert_eq!(data.name, "Basil at2");
    }

    #[test]
    fn test_speaker_serialization() {
        let data = SpeakerData::parse("ganyariya [0:Happy] as ???");
        let json = serde_json::to_string(&data).unwrap();
        let restored: SpeakerData = serde_json::from_str(&json).unwrap();
        assert_eq!(data, restored);
    }
}
