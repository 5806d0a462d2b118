//! 资源标识符规范化工具
//! 标识符遵循 `namespace:path` 约定，带标签前缀（默认 `#`）表示引用另一个标签

use crate::config::GlobalConfig;

/// 标识符规范化工具
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdNormalizer {
    default_namespace: String,
    tag_marker: char,
}

impl IdNormalizer {
    pub fn new(default_namespace: impl Into<String>, tag_marker: char) -> Self {
        Self {
            default_namespace: default_namespace.into(),
            tag_marker,
        }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.default_namespace.clone(), config.tag_marker)
    }

    pub fn tag_marker(&self) -> char {
        self.tag_marker
    }

    /// 拆分标签前缀：返回（是否为标签引用，去掉前缀后的标识符）
    pub fn split_marker<'a>(&self, raw: &'a str) -> (bool, &'a str) {
        match raw.strip_prefix(self.tag_marker) {
            Some(rest) => (true, rest),
            None => (false, raw),
        }
    }

    /// 补全命名空间（不处理标签前缀）
    pub fn with_namespace(&self, id: &str) -> String {
        if id.contains(':') {
            id.to_string()
        } else {
            format!("{}:{}", self.default_namespace, id)
        }
    }

    /// 完整规范化：保留标签前缀，仅对其后的部分补全命名空间
    /// - `plains` -> `minecraft:plains`
    /// - `#is_forest` -> `#minecraft:is_forest`
    pub fn normalize(&self, raw: &str) -> String {
        let (is_tag, id) = self.split_marker(raw);
        let id = self.with_namespace(id);
        if is_tag {
            format!("{}{}", self.tag_marker, id)
        } else {
            id
        }
    }

    /// 判断标识符是否代表“整个主世界”（带不带标签前缀均可）
    pub fn is_overworld(&self, raw: &str, overworld_ids: &[String]) -> bool {
        if raw.trim().is_empty() {
            return false;
        }
        let (_, id) = self.split_marker(raw);
        let id = self.with_namespace(id);
        overworld_ids
            .iter()
            .any(|known| self.with_namespace(self.split_marker(known).1) == id)
    }

    /// 剥离给定命名空间前缀（如 `cobblemon:pikachu` -> `pikachu`）
    pub fn strip_namespace<'a>(id: &'a str, namespace: &str) -> &'a str {
        id.strip_prefix(namespace)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(id)
    }
}

impl Default for IdNormalizer {
    fn default() -> Self {
        Self::new("minecraft", '#')
    }
}
