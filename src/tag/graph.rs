//! 原始标签图
//! 标签 ID -> 条目列表（具体位置或对其他标签的引用），可能存在环

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{RspResult, RspawnError};
use crate::utils::FilenameSanitizer;

/// 标签条目：裸字符串，或 `{"id": "...", "required": false}` 记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagEntry {
    Id(String),
    Record {
        id: String,
        // 解析时忽略
        #[serde(default, skip_serializing_if = "Option::is_none")]
        required: Option<bool>,
    },
}

impl TagEntry {
    pub fn id(&self) -> &str {
        match self {
            TagEntry::Id(id) => id,
            TagEntry::Record { id, .. } => id,
        }
    }
}

/// 标签定义文件
#[derive(Debug, Deserialize)]
struct TagFile {
    #[serde(default)]
    values: Option<Vec<Value>>,
}

/// 原始标签图（邻接表）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagGraph {
    tags: BTreeMap<String, Vec<TagEntry>>,
}

impl TagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加标签条目；多个来源定义同一标签时条目合并
    pub fn extend_tag(&mut self, tag_id: impl Into<String>, entries: impl IntoIterator<Item = TagEntry>) {
        self.tags.entry(tag_id.into()).or_default().extend(entries);
    }

    pub fn contains(&self, tag_id: &str) -> bool {
        self.tags.contains_key(tag_id)
    }

    pub fn entries(&self, tag_id: &str) -> &[TagEntry] {
        self.tags.get(tag_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tag_ids(&self) -> impl Iterator<Item = &String> {
        self.tags.keys()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// 由文件路径推断标签ID
    /// `data/<namespace>/<tag_dir>/<path>.json` -> `<namespace>:<path>`
    pub fn tag_id_from_path(path: &str, tag_dir: &str) -> Option<String> {
        let relative = FilenameSanitizer::data_relative(path)?;
        let mut parts = relative.splitn(3, '/');
        let (_data, namespace, rest) = (parts.next()?, parts.next()?, parts.next()?);
        let tag_path = rest
            .strip_prefix(tag_dir.trim_matches('/'))?
            .strip_prefix('/')?
            .strip_suffix(".json")?;
        if namespace.is_empty() || tag_path.is_empty() {
            return None;
        }
        Some(format!("{}:{}", namespace, tag_path))
    }

    /// 读取单个标签定义文件，返回写入的标签ID
    /// 无法识别的条目逐条丢弃，不影响同文件中的其他条目
    pub fn ingest_bytes(&mut self, path: &str, tag_dir: &str, bytes: &[u8]) -> RspResult<String> {
        let tag_id = Self::tag_id_from_path(path, tag_dir)
            .ok_or_else(|| RspawnError::TagParseError(format!("无法从路径推断标签ID：{}", path)))?;
        let file: TagFile = serde_json::from_slice(bytes)?;
        let values = file
            .values
            .ok_or_else(|| RspawnError::TagParseError(format!("标签文件缺少 values 字段：{}", path)))?;

        let total = values.len();
        let entries: Vec<TagEntry> = values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        if entries.len() < total {
            debug!("标签 {} 丢弃 {} 个无法识别的条目", tag_id, total - entries.len());
        }

        self.extend_tag(tag_id.clone(), entries);
        Ok(tag_id)
    }
}

impl FromIterator<(String, Vec<TagEntry>)> for TagGraph {
    fn from_iter<I: IntoIterator<Item = (String, Vec<TagEntry>)>>(iter: I) -> Self {
        let mut graph = TagGraph::new();
        for (tag_id, entries) in iter {
            graph.extend_tag(tag_id, entries);
        }
        graph
    }
}
