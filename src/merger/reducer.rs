//! 冗余消除
//! 按特异度从高到低贪心扫描：候选规则若是某条已保留规则的泛化，则丢弃
//!
//! 只与已保留的规则比较，已保留的规则之后不会再被移除。
//! 结果依赖扫描顺序，不保证全局最小。

use std::cmp::Reverse;
use std::collections::BTreeSet;

use tracing::{trace, warn};

use crate::config::{GlobalConfig, LocationMatchMode, SpecificityWeights};
use crate::rule::{SpawnCondition, SpawnRule};
use crate::tag::ResolvedTagIndex;

/// 冗余规则消除器
#[derive(Debug, Clone)]
pub struct RedundancyReducer<'a> {
    weights: SpecificityWeights,
    mode: LocationMatchMode,
    index: Option<&'a ResolvedTagIndex>,
}

impl<'a> RedundancyReducer<'a> {
    pub fn new(config: &GlobalConfig) -> Self {
        Self {
            weights: config.specificity,
            mode: config.location_match,
            index: None,
        }
    }

    /// 提供标签索引，供 `LocationMatchMode::Resolved` 使用
    pub fn with_index(mut self, index: &'a ResolvedTagIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// 特异度评分：每个约束属性按权重累加
    pub fn specificity(&self, rule: &SpawnRule) -> u32 {
        let w = &self.weights;
        let mut score = 0;

        if let Some(cond) = &rule.condition {
            if cond.time_range.is_some() {
                score += w.time_range;
            }
            if cond.weather.is_some() {
                score += w.weather;
            }
            if cond.has_vertical_bound() {
                score += w.vertical_bound;
            }
            if cond.has_light_bound() {
                score += w.light_bound;
            }
            if cond.can_see_sky.is_some() {
                score += w.can_see_sky;
            }
        }
        if !rule.location_groups().is_empty() {
            score += w.location_groups;
        }
        if rule.has_anticondition() {
            score += w.anti_condition;
        }
        score
    }

    /// `candidate` 是否为已保留规则 `accepted` 的泛化
    /// - 执行上下文相同
    /// - 候选约束位置组时，已保留规则的位置组非空且为其子集
    /// - 候选约束的时间段 / 天气 / 可见天空，已保留规则取值完全相同
    pub fn is_generalization(&self, accepted: &SpawnRule, candidate: &SpawnRule) -> bool {
        if accepted.execution_context() != candidate.execution_context() {
            return false;
        }

        if !candidate.location_groups().is_empty() {
            let specific = self.location_set(accepted);
            let general = self.location_set(candidate);
            if specific.is_empty() || !specific.is_subset(&general) {
                return false;
            }
        }

        let empty = SpawnCondition::default();
        let specific = accepted.condition.as_ref().unwrap_or(&empty);
        let general = candidate.condition.as_ref().unwrap_or(&empty);

        fn same_if_constrained<T: PartialEq>(specific: &Option<T>, general: &Option<T>) -> bool {
            general.is_none() || specific == general
        }

        same_if_constrained(&specific.time_range, &general.time_range)
            && same_if_constrained(&specific.weather, &general.weather)
            && same_if_constrained(&specific.can_see_sky, &general.can_see_sky)
    }

    /// 消除单个实体的冗余规则，返回（保留的规则，移除数量）
    /// 保留规则的ID按 `{entity}-{index}` 重新编号
    pub fn reduce(&self, entity: &str, rules: Vec<SpawnRule>) -> (Vec<SpawnRule>, usize) {
        let mut scored: Vec<(u32, SpawnRule)> = rules
            .into_iter()
            .map(|r| (self.specificity(&r), r))
            .collect();
        // 稳定排序，同分保持原顺序
        scored.sort_by_key(|(score, _)| Reverse(*score));

        let mut kept: Vec<SpawnRule> = Vec::with_capacity(scored.len());
        let mut removed = 0;
        for (_, candidate) in scored {
            if kept.iter().any(|accepted| self.is_generalization(accepted, &candidate)) {
                removed += 1;
            } else {
                kept.push(candidate);
            }
        }

        for (i, rule) in kept.iter_mut().enumerate() {
            rule.id = format!("{}-{}", entity, i);
        }
        trace!("实体 {} 冗余消除：保留 {}，移除 {}", entity, kept.len(), removed);
        (kept, removed)
    }

    fn location_set(&self, rule: &SpawnRule) -> BTreeSet<String> {
        match (self.mode, self.index) {
            (LocationMatchMode::Resolved, Some(index)) => index.expand_all(rule.location_groups()),
            (LocationMatchMode::Resolved, None) => {
                warn!("Resolved 模式缺少标签索引，退回按原始标识比较");
                rule.location_groups().iter().cloned().collect()
            }
            (LocationMatchMode::Literal, _) => rule.location_groups().iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::tag::{TagEntry, TagGraph};
    use crate::utils::IdNormalizer;
    use serde_json::{Value, json};

    fn rule(value: Value) -> SpawnRule {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_specificity_score() {
        // 测试场景：各约束属性按默认权重累加
        let config = GlobalConfig::default();
        let reducer = RedundancyReducer::new(&config);

        let full = rule(json!({
            "condition": {
                "biomes": ["a"], "timeRange": "night", "weather": "rain",
                "minY": 10, "maxSkyLight": 7, "canSeeSky": false
            },
            "anticondition": { "biomes": ["b"] }
        }));
        assert_eq!(reducer.specificity(&full), 2 + 2 + 2 + 1 + 3 + 1 + 1);
        assert_eq!(reducer.specificity(&rule(json!({}))), 0);
        assert_eq!(reducer.specificity(&rule(json!({ "condition": { "biomes": [] } }))), 0);
    }

    #[test]
    fn test_general_rule_removed_after_specific() {
        // 测试场景：森林+夜晚 先被保留，随后的 仅森林 规则是其泛化，被移除
        let config = GlobalConfig::default();
        let reducer = RedundancyReducer::new(&config);

        let rules = vec![
            rule(json!({ "id": "g", "condition": { "biomes": ["minecraft:forest"] } })),
            rule(json!({ "id": "s", "condition": { "biomes": ["minecraft:forest"], "timeRange": "night" } })),
        ];
        let (kept, removed) = reducer.reduce("hoothoot", rules);

        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(
            kept[0].condition.as_ref().unwrap().time_range.as_deref(),
            Some("night")
        );
        assert_eq!(kept[0].id, "hoothoot-0");
    }

    #[test]
    fn test_wider_location_set_is_generalization() {
        // 测试场景：候选位置组包含已保留规则的位置组时视为泛化
        let config = GlobalConfig::default();
        let reducer = RedundancyReducer::new(&config);

        let accepted = rule(json!({ "condition": { "biomes": ["forest"], "canSeeSky": true } }));
        let wider = rule(json!({ "condition": { "biomes": ["forest", "taiga"] } }));
        let disjoint = rule(json!({ "condition": { "biomes": ["taiga"] } }));
        let global = rule(json!({}));

        assert!(reducer.is_generalization(&accepted, &wider));
        assert!(!reducer.is_generalization(&accepted, &disjoint));
        assert!(reducer.is_generalization(&accepted, &global));
        assert!(!reducer.is_generalization(&global, &wider));
    }

    #[test]
    fn test_context_and_values_must_match() {
        // 测试场景：上下文不同或约束值不同时不算泛化
        let config = GlobalConfig::default();
        let reducer = RedundancyReducer::new(&config);

        let accepted = rule(json!({ "context": "submerged", "condition": { "timeRange": "day" } }));
        let other_ctx = rule(json!({ "context": "grounded" }));
        let other_time = rule(json!({ "context": "submerged", "condition": { "timeRange": "night" } }));
        let legacy_default = rule(json!({ "condition": { "timeRange": "day" } }));

        assert!(!reducer.is_generalization(&accepted, &other_ctx));
        assert!(!reducer.is_generalization(&accepted, &other_time));
        assert!(!reducer.is_generalization(&accepted, &legacy_default));
    }

    #[test]
    fn test_greedy_keeps_order_dependent_result() {
        // 测试场景：同分规则保持输入顺序；先保留的泛化规则不会被后来的具体规则移除
        let config = GlobalConfig::default();
        let reducer = RedundancyReducer::new(&config);

        let wide = json!({ "id": "w", "condition": { "biomes": ["x", "y"], "weather": "rain" } });
        let narrow = json!({ "id": "n", "condition": { "biomes": ["x"], "weather": "rain" } });

        let (kept, removed) = reducer.reduce("e", vec![rule(wide.clone()), rule(narrow.clone())]);
        assert_eq!(removed, 0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].location_groups(), ["x", "y"]);
        assert_eq!(kept[1].id, "e-1");

        let (kept, removed) = reducer.reduce("e", vec![rule(narrow), rule(wide)]);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].location_groups(), ["x"]);
    }

    #[test]
    fn test_lower_score_general_rule_removed() {
        // 测试场景：高分规则先被保留，低分的宽位置组规则被移除
        let config = GlobalConfig::default();
        let reducer = RedundancyReducer::new(&config);

        let rules = vec![
            rule(json!({ "condition": { "biomes": ["x", "y"] } })),
            rule(json!({ "condition": { "biomes": ["x"], "weather": "rain" } })),
            rule(json!({ "condition": { "biomes": ["y"], "timeRange": "day" } })),
        ];
        let (kept, removed) = reducer.reduce("e", rules);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].condition.as_ref().unwrap().weather.as_deref(), Some("rain"));
        assert_eq!(kept[1].condition.as_ref().unwrap().time_range.as_deref(), Some("day"));
    }

    #[test]
    fn test_resolved_mode_compares_expanded_sets() {
        // 测试场景：Resolved 模式下，森林 ⊆ #is_forest 展开后的集合
        let graph: TagGraph = [(
            "minecraft:is_forest".to_string(),
            vec![
                TagEntry::Id("minecraft:forest".to_string()),
                TagEntry::Id("minecraft:birch_forest".to_string()),
            ],
        )]
        .into_iter()
        .collect();
        let index = ResolvedTagIndex::build(&graph, IdNormalizer::default());

        let config = ConfigManager::custom()
            .location_match(LocationMatchMode::Resolved)
            .build();
        let reducer = RedundancyReducer::new(&config).with_index(&index);
        let literal = RedundancyReducer::new(&GlobalConfig::default());

        let accepted = rule(json!({ "condition": { "biomes": ["forest"], "timeRange": "day" } }));
        let tag_rule = rule(json!({ "condition": { "biomes": ["#minecraft:is_forest"] } }));
        let missing = rule(json!({ "condition": { "biomes": ["#mod:unknown"] } }));

        assert!(reducer.is_generalization(&accepted, &tag_rule));
        assert!(!literal.is_generalization(&accepted, &tag_rule));
        assert!(!reducer.is_generalization(&missing, &tag_rule));
    }
}
