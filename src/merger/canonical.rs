//! 规则签名
//! 去掉与语义无关的字段后做规范化序列化，签名相同即视为语义等价

use serde_json::{Map, Value};

use crate::config::GlobalConfig;
use crate::error::{RspResult, RspawnError};
use crate::rule::SpawnRule;

/// 规则签名生成器
#[derive(Debug, Clone)]
pub struct RuleCanonicalizer {
    ignored_fields: Vec<String>,
}

impl RuleCanonicalizer {
    pub fn new(ignored_fields: Vec<String>) -> Self {
        Self { ignored_fields }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.ignored_signature_fields.clone())
    }

    /// 计算规则签名（仅用作分组键）
    /// - 顶层去掉 id / 注释 / 权重等字段
    /// - condition 去掉位置组列表，其余列表排序
    /// - anticondition 保留位置组列表，列表同样排序
    pub fn signature(&self, rule: &SpawnRule) -> RspResult<String> {
        let Value::Object(mut root) = serde_json::to_value(rule)? else {
            return Err(RspawnError::InvalidInput("规则未序列化为对象".to_string()));
        };

        for field in &self.ignored_fields {
            root.remove(field);
        }
        if let Some(Value::Object(condition)) = root.get_mut("condition") {
            condition.remove("biomes");
            sort_list_values(condition);
        }
        if let Some(Value::Object(anticondition)) = root.get_mut("anticondition") {
            sort_list_values(anticondition);
        }

        Ok(serde_json::to_string(&canonicalize(Value::Object(root)))?)
    }
}

/// 对象中的列表值按元素的序列化文本排序
fn sort_list_values(map: &mut Map<String, Value>) {
    for value in map.values_mut() {
        if let Value::Array(items) = value {
            items.sort_by_cached_key(|item| item.to_string());
        }
    }
}

/// 递归按键名排序，保证输出与字段插入顺序无关
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
