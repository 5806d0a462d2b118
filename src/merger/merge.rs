//! 规则合并引擎
//! 单个实体的处理流程：排除 -> 按位置组拆分 -> 签名分组 -> 主世界压制 -> 合成

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, trace};

use super::canonical::RuleCanonicalizer;
use super::stats::MergeStats;
use crate::config::GlobalConfig;
use crate::rule::SpawnRule;
use crate::utils::IdNormalizer;

/// 签名相同的一组规则（仅在合并期间存在）
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    pub signature: String,
    pub rules: Vec<SpawnRule>,
}

impl RuleGroup {
    /// 组内每条规则唯一的位置组值（全局规则为空串）
    fn location_of(rule: &SpawnRule) -> &str {
        rule.location_groups().first().map(String::as_str).unwrap_or("")
    }
}

/// 规则合并引擎
#[derive(Debug, Clone)]
pub struct MergeEngine<'a> {
    config: &'a GlobalConfig,
    canonicalizer: RuleCanonicalizer,
    normalizer: IdNormalizer,
    exclusion_keywords: Vec<String>,
}

impl<'a> MergeEngine<'a> {
    pub fn new(config: &'a GlobalConfig) -> Self {
        Self {
            config,
            canonicalizer: RuleCanonicalizer::from_config(config),
            normalizer: IdNormalizer::from_config(config),
            exclusion_keywords: config.exclusion.keywords(),
        }
    }

    /// 实体是否命中排除名单（去掉实体命名空间后做小写子串匹配）
    pub fn is_excluded(&self, entity: &str) -> bool {
        let lower = entity.to_lowercase();
        let name = IdNormalizer::strip_namespace(&lower, &self.config.entity_namespace);
        self.exclusion_keywords.iter().any(|k| name.contains(k.as_str()))
    }

    /// 合并单个实体的规则；实体被排除时返回空列表
    pub fn merge(&self, entity: &str, rules: Vec<SpawnRule>, stats: &mut MergeStats) -> Vec<SpawnRule> {
        stats.entities_in += 1;
        stats.rules_in += rules.len() as u32;

        if self.is_excluded(entity) {
            debug!("实体 {} 命中排除名单，丢弃 {} 条规则", entity, rules.len());
            stats.entities_excluded += 1;
            return Vec::new();
        }

        let flat = self.flatten(rules, stats);
        let groups = self.group(flat, stats);

        let mut merged = Vec::with_capacity(groups.len());
        for group in groups {
            let survivors = self.apply_overworld_dominance(group, stats);
            if let Some(rule) = self.synthesize(entity, merged.len(), survivors) {
                merged.push(rule);
            }
        }

        stats.merged_rules += merged.len() as u32;
        trace!("实体 {} 合并后规则数：{}", entity, merged.len());
        merged
    }

    /// 按位置组拆分：每个位置组条目生成一条独立规则
    /// 空白条目先替换为主世界引用；没有位置组的全局规则保持原样
    pub fn flatten(&self, rules: Vec<SpawnRule>, stats: &mut MergeStats) -> Vec<SpawnRule> {
        let mut flat = Vec::with_capacity(rules.len());
        for mut rule in rules {
            if rule.fill_blank_locations(&self.config.overworld_reference) {
                stats.blank_locations_fixed += 1;
            }

            let groups = rule.location_groups().to_vec();
            if groups.is_empty() {
                flat.push(rule);
                continue;
            }
            for group in groups {
                let mut single = rule.clone();
                single.set_location_groups(vec![group]);
                flat.push(single);
            }
        }
        stats.flattened_rules += flat.len() as u32;
        flat
    }

    /// 按签名分组，组的顺序与签名首次出现的顺序一致
    pub fn group(&self, rules: Vec<SpawnRule>, stats: &mut MergeStats) -> Vec<RuleGroup> {
        let mut groups: Vec<RuleGroup> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for rule in rules {
            let signature = match self.canonicalizer.signature(&rule) {
                Ok(sig) => sig,
                Err(e) => {
                    debug!("规则签名计算失败，已跳过：{}", e);
                    stats.unsignable_rules += 1;
                    continue;
                }
            };
            match positions.get(&signature) {
                Some(&pos) => groups[pos].rules.push(rule),
                None => {
                    positions.insert(signature.clone(), groups.len());
                    groups.push(RuleGroup {
                        signature,
                        rules: vec![rule],
                    });
                }
            }
        }

        stats.groups += groups.len() as u32;
        groups
    }

    /// 主世界压制：组内出现多个位置组值且其中包含主世界时，丢弃主世界规则
    /// 只有主世界一个值时保留
    pub fn apply_overworld_dominance(&self, group: RuleGroup, stats: &mut MergeStats) -> Vec<SpawnRule> {
        let overworld_ids = &self.config.overworld_ids;
        let mut distinct: BTreeSet<&str> = BTreeSet::new();
        let mut has_overworld = false;

        for rule in &group.rules {
            let location = RuleGroup::location_of(rule);
            if location.is_empty() {
                continue;
            }
            distinct.insert(location);
            if self.normalizer.is_overworld(location, overworld_ids) {
                has_overworld = true;
            }
        }

        if !(has_overworld && distinct.len() > 1) {
            return group.rules;
        }

        let before = group.rules.len();
        let survivors: Vec<SpawnRule> = group
            .rules
            .into_iter()
            .filter(|r| !self.normalizer.is_overworld(RuleGroup::location_of(r), overworld_ids))
            .collect();
        stats.overworld_dominated += (before - survivors.len()) as u32;
        survivors
    }

    /// 合成一条规则：以首条规则为模板，位置组取并集排序，权重取平均
    /// 成员为空时返回 None
    pub fn synthesize(&self, entity: &str, index: usize, members: Vec<SpawnRule>) -> Option<SpawnRule> {
        if members.is_empty() {
            return None;
        }
        let locations: BTreeSet<String> = members
            .iter()
            .filter_map(|r| r.location_groups().first().cloned())
            .collect();
        let total: f64 = members.iter().map(|r| r.weight_or(self.config.default_weight)).sum();
        let mean = total / members.len() as f64;

        let mut template = members.into_iter().next()?;
        template.weight = Some(round_to(mean, self.config.weight_precision));
        if !locations.is_empty() {
            template.set_location_groups(locations.into_iter().collect());
        }
        template.id = format!("{}-{}", entity, index);
        Some(template)
    }
}

/// 舍入到指定小数位，恰好一半时取偶数
fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round_ties_even() / factor
}
