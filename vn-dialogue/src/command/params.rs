//! # 参数提取
//!
//! 从指令参数中按 `-flag value` 形式提取带类型的值：
//!
//! ```text
//! ["Elen", "-x", "0.5", "-i", "true"]
//!            └─ -x = "0.5"  └─ -i = "true"
//! ```
//!
//! 以 `-` 开头但可以解析为数字的参数（如 `-20`）是值，不是 flag。

use std::collections::HashMap;

use tracing::debug;

const PARAMETER_IDENTIFIER: char = '-';

/// 可从参数字符串解析的值类型
pub trait ParamValue: Sized {
    fn parse_param(raw: &str) -> Option<Self>;
}

impl ParamValue for bool {
    /// 大小写不敏感的 `true` / `false`
    fn parse_param(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl ParamValue for i32 {
    fn parse_param(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl ParamValue for f32 {
    fn parse_param(raw: &str) -> Option<Self> {
        raw.trim().parse().ok().filter(|v: &f32| v.is_finite())
    }
}

impl ParamValue for String {
    fn parse_param(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

/// flag 参数表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParameterFetcher {
    parameters: HashMap<String, String>,
}

impl CommandParameterFetcher {
    pub fn new(args: &[String]) -> Self {
        Self::with_start_index(args, 0)
    }

    /// 跳过前 `start_index` 个位置参数后再扫描 flag
    pub fn with_start_index(args: &[String], start_index: usize) -> Self {
        let mut parameters = HashMap::new();
        let mut i = start_index;

        while i < args.len() {
            let key = &args[i];
            if !is_flag(key) {
                i += 1;
                continue;
            }
            // 末尾只有 key 没有值时跳过
            let Some(value) = args.get(i + 1) else {
                break;
            };
            if parameters.contains_key(key) {
                debug!(flag = %key, "重复的参数，保留第一次出现的值");
            } else {
                parameters.insert(key.clone(), value.clone());
            }
            i += 2;
        }

        Self { parameters }
    }

    /// 按别名顺序查找第一个能成功解析的值
    ///
    /// 别名在数组中的顺序决定优先级，与参数出现的顺序无关。
    pub fn try_get<T: ParamValue>(&self, names: &[&str]) -> Option<T> {
        names
            .iter()
            .filter_map(|name| self.parameters.get(*name))
            .find_map(|raw| T::parse_param(raw))
    }

    /// 同 [`try_get`](Self::try_get)，找不到或无法解析时返回 `default`
    pub fn get_or<T: ParamValue>(&self, names: &[&str], default: T) -> T {
        self.try_get(names).unwrap_or(default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

fn is_flag(token: &str) -> bool {
    token.starts_with(PARAMETER_IDENTIFIER) && f32::parse_param(token).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(items: &[&str]) -> CommandParameterFetcher {
        let args: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        CommandParameterFetcher::new(&args)
    }

    #[test]
    fn test_bool_flag() {
        let f = fetcher(&["cake", "-i", "true"]);
        assert_eq!(f.try_get::<bool>(&["-i"]), Some(true));
        assert_eq!(f.try_get::<bool>(&["-e"]), None);
        assert!(!f.get_or(&["-e", "-enabled"], false));
    }

    #[test]
    fn test_alias_order_wins() {
        let f = fetcher(&["cake", "-immediate", "true", "-i", "false"]);
        assert_eq!(f.try_get::<bool>(&["-i", "-immediate"]), Some(false));

        let f = fetcher(&["-i", "true", "-immediate", "false"]);
        assert_eq!(f.try_get::<bool>(&["-i", "-immediate"]), Some(true));
        assert_eq!(f.try_get::<bool>(&["-immediate", "-i"]), Some(false));
    }

    #[test]
    fn test_absent_uses_default() {
        let f = fetcher(&["cake", "false"]);
        assert_eq!(f.try_get::<bool>(&["-i"]), None);
        assert!(f.get_or(&["-i"], true));
        assert!(f.is_empty());
    }

    #[test]
    fn test_typed_values() {
        let f = fetcher(&["cake", "false", "-i", "10", "20"]);
        assert_eq!(f.try_get::<i32>(&["-i"]), Some(10));

        let f = fetcher(&["cake", "false", "-i", "10.40", "20"]);
        assert_eq!(f.try_get::<f32>(&["-i"]), Some(10.40));
        // 无法解析为 int
        assert_eq!(f.get_or::<i32>(&["-i"], 100), 100);

        let f = fetcher(&["cake", "false", "-i", "hello, world", "20"]);
        assert_eq!(f.try_get::<String>(&["-i"]), Some("hello, world".to_string()));
        assert_eq!(f.get_or::<i32>(&[], 0), 0);
    }

    #[test]
    fn test_unparseable_alias_falls_through() {
        let f = fetcher(&["-v", "loud", "-volume", "0.5"]);
        assert_eq!(f.try_get::<f32>(&["-v", "-volume"]), Some(0.5));
    }

    #[test]
    fn test_negative_number_is_value() {
        let f = fetcher(&["-y", "-20"]);
        assert_eq!(f.try_get::<f32>(&["-y"]), Some(-20.0));
        assert_eq!(f.try_get::<i32>(&["-y"]), Some(-20));
    }

    #[test]
    fn test_trailing_flag_without_value() {
        let f = fetcher(&["-y", "-20", "-x"]);
        assert_eq!(f.try_get::<f32>(&["-x"]), None);
        assert_eq!(f.get_or(&["-x"], 0.0_f32), 0.0);
        assert!(!f.contains("-x"));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn test_duplicate_flag_keeps_first() {
        let f = fetcher(&["-x", "1", "-x", "2"]);
        assert_eq!(f.try_get::<i32>(&["-x"]), Some(1));
    }

    #[test]
    fn test_start_index_skips_positional() {
        let args: Vec<String> = ["-name", "-x", "3"].iter().map(|s| s.to_string()).collect();
        let f = CommandParameterFetcher::with_start_index(&args, 1);
        assert!(!f.contains("-name"));
        assert_eq!(f.try_get::<i32>(&["-x"]), Some(3));
    }

    #[test]
    fn test_bool_case_insensitive() {
        let f = fetcher(&["-i", " TRUE "]);
        assert_eq!(f.try_get::<bool>(&["-i"]), Some(true));
    }
}
