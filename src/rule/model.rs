//! 刷怪规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化
//! 未建模的字段通过 `extra` 原样保留，输出时不会丢失

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// 执行上下文缺省值
pub const DEFAULT_CONTEXT: &str = "grounded";

/// 条件集（condition / anticondition 共用同一结构）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnCondition {
    /// 位置组列表（生物群系或生物群系标签）
    #[serde(
        default,
        deserialize_with = "deserialize_location_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub biomes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_see_sky: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_sky_light: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sky_light: Option<i32>,

    // 其余条件（结构、月相、方块等）原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpawnCondition {
    /// 条件集中没有任何字段（与空对象 `{}` 等价）
    pub fn is_empty(&self) -> bool {
        self.biomes.is_none()
            && self.time_range.is_none()
            && self.weather.is_none()
            && self.can_see_sky.is_none()
            && !self.has_vertical_bound()
            && !self.has_light_bound()
            && self.extra.is_empty()
    }

    pub fn has_vertical_bound(&self) -> bool {
        self.min_y.is_some() || self.max_y.is_some()
    }

    pub fn has_light_bound(&self) -> bool {
        self.min_sky_light.is_some() || self.max_sky_light.is_some()
    }
}

/// 单条刷怪规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRule {
    /// 规则ID，输出时重新生成
    #[serde(default)]
    pub id: String,
    /// 所属实体
    #[serde(rename = "pokemon", default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// 执行上下文（grounded / submerged / surface ...）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<SpawnCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anticondition: Option<SpawnCondition>,

    // bucket、level、presets 等字段原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpawnRule {
    /// 执行上下文，缺省为 grounded
    pub fn execution_context(&self) -> &str {
        self.context.as_deref().unwrap_or(DEFAULT_CONTEXT)
    }

    /// 位置组列表（无条件或无列表时为空）
    pub fn location_groups(&self) -> &[String] {
        self.condition
            .as_ref()
            .and_then(|c| c.biomes.as_deref())
            .unwrap_or(&[])
    }

    /// 覆盖位置组列表，必要时创建条件集
    pub fn set_location_groups(&mut self, groups: Vec<String>) {
        self.condition.get_or_insert_with(SpawnCondition::default).biomes = Some(groups);
    }

    pub fn weight_or(&self, default: f64) -> f64 {
        self.weight.unwrap_or(default)
    }

    /// 将空白位置组条目替换为 `replacement`，返回是否发生替换
    pub fn fill_blank_locations(&mut self, replacement: &str) -> bool {
        let Some(groups) = self.condition.as_mut().and_then(|c| c.biomes.as_mut()) else {
            return false;
        };
        let mut replaced = false;
        for group in groups.iter_mut() {
            if group.trim().is_empty() {
                *group = replacement.to_string();
                replaced = true;
            }
        }
        replaced
    }

    /// 存在非空反条件
    pub fn has_anticondition(&self) -> bool {
        self.anticondition.as_ref().is_some_and(|a| !a.is_empty())
    }
}

/// 刷怪池文件（spawn_pool_world/<entity>.json）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoolFile {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "neededInstalledMods", default)]
    pub needed_installed_mods: Vec<String>,
    #[serde(default)]
    pub spawns: Vec<SpawnRule>,
}

impl SpawnPoolFile {
    /// 启用状态、无模组依赖的输出文件
    pub fn enabled(spawns: Vec<SpawnRule>) -> Self {
        Self {
            enabled: true,
            needed_installed_mods: Vec::new(),
            spawns,
        }
    }

    /// 屏蔽文件：`{"enabled": false, "spawns": []}`
    pub fn blocker() -> Self {
        Self {
            enabled: false,
            needed_installed_mods: Vec::new(),
            spawns: Vec::new(),
        }
    }
}

/// 采集阶段输出：实体 -> 原始规则（按采集顺序）
pub type RawEntityRules = BTreeMap<String, Vec<SpawnRule>>;

/// 最终输出：实体 -> 合并去重后的规则
pub type EntityRuleTable = BTreeMap<String, Vec<SpawnRule>>;

fn default_enabled() -> bool {
    true
}

/// 位置组列表中的 null 按空白条目处理，留给后续统一替换
fn deserialize_location_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|list| list.into_iter().map(Option::unwrap_or_default).collect()))
}
