//! 处理流水线：整合采集、合并、冗余消除与输出
//! 各实体互相独立，按实体名顺序处理，输出与输入顺序无关

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::GlobalConfig;
use crate::error::RspResult;
use crate::merger::{MergeEngine, MergeStats, RedundancyReducer};
use crate::rule::{EntityRuleTable, RawEntityRules, RuleLoader};
use crate::tag::{BiomeDatabase, ResolvedTagIndex};
use crate::utils::{FilenameSanitizer, IdNormalizer};

/// 流水线输出
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub table: EntityRuleTable,
    pub stats: MergeStats,
}

/// 规则处理流水线
#[derive(Debug, Clone)]
pub struct SpawnPipeline {
    config: GlobalConfig,
    tag_index: Option<ResolvedTagIndex>,
}

impl SpawnPipeline {
    pub fn new(config: GlobalConfig) -> Self {
        Self {
            config,
            tag_index: None,
        }
    }

    /// 附加标签索引（冗余消除按展开后的位置集合比较时需要）
    pub fn with_tag_index(mut self, index: ResolvedTagIndex) -> Self {
        self.tag_index = Some(index);
        self
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn tag_index(&self) -> Option<&ResolvedTagIndex> {
        self.tag_index.as_ref()
    }

    /// 合并 + 冗余消除
    pub fn run(&self, raw: RawEntityRules) -> PipelineOutput {
        self.process(raw, true, true)
    }

    /// 仅合并
    pub fn unify(&self, raw: RawEntityRules) -> PipelineOutput {
        self.process(raw, true, false)
    }

    /// 仅冗余消除（输入为已合并的规则表）
    pub fn clean(&self, table: EntityRuleTable) -> PipelineOutput {
        self.process(table, false, true)
    }

    fn process(&self, raw: RawEntityRules, merge: bool, reduce: bool) -> PipelineOutput {
        let start = Instant::now();
        let engine = MergeEngine::new(&self.config);
        let reducer = match &self.tag_index {
            Some(index) => RedundancyReducer::new(&self.config).with_index(index),
            None => RedundancyReducer::new(&self.config),
        };

        let mut output = PipelineOutput::default();
        for (entity, rules) in raw {
            let mut stats = MergeStats::default();
            let mut rules = if merge {
                engine.merge(&entity, rules, &mut stats)
            } else {
                stats.entities_in += 1;
                stats.rules_in += rules.len() as u32;
                rules
            };

            if reduce && !rules.is_empty() {
                let (kept, removed) = reducer.reduce(&entity, rules);
                stats.redundant_removed += removed as u32;
                rules = kept;
            }

            if rules.is_empty() {
                debug!("实体 {} 没有剩余规则，不输出", entity);
            } else {
                stats.entities_out += 1;
                stats.rules_out += rules.len() as u32;
                output.table.insert(entity, rules);
            }
            output.stats.absorb(&stats);
        }

        output.stats.print_stats(start.elapsed());
        output
    }
}

/// 将规则表的键改为输出文件名（不含扩展名）
/// 与重新读取已写出的数据包得到的实体名一致，清理阶段生成的ID因此相同
/// 清洗后同名的实体规则按原顺序拼接
pub fn key_by_file_stem(table: EntityRuleTable) -> EntityRuleTable {
    let mut keyed = EntityRuleTable::new();
    for (entity, rules) in table {
        keyed
            .entry(FilenameSanitizer::sanitize(&entity))
            .or_insert_with(Vec::new)
            .extend(rules);
    }
    keyed
}

/// 加载标签索引：优先读取已保存的生物群系数据库，不存在时扫描标签文件现场构建
pub async fn load_tag_index(config: &GlobalConfig) -> RspResult<ResolvedTagIndex> {
    let normalizer = IdNormalizer::from_config(config);
    let db_path = config.output_dir.join(&config.biome_database_file);

    if db_path.exists() {
        match RuleLoader::load_biome_database(&db_path).await {
            Ok(db) => return Ok(ResolvedTagIndex::from_database(db, normalizer)),
            Err(e) => warn!("生物群系数据库读取失败，改为重新构建：{}", e),
        }
    }
    build_tag_index(config).await.map(|(index, _)| index)
}

/// 扫描标签文件并构建索引，同时返回可持久化的数据库
pub async fn build_tag_index(config: &GlobalConfig) -> RspResult<(ResolvedTagIndex, BiomeDatabase)> {
    let (graph, stats) = RuleLoader::load_tag_graph(config).await?;
    stats.print_stats();

    let start = Instant::now();
    let index = ResolvedTagIndex::build(&graph, IdNormalizer::from_config(config));
    let db = index.to_database();
    info!(
        "标签展开完成 | 耗时: {:?} | 标签 {} | 生物群系 {}",
        start.elapsed(),
        db.stats.total_tags,
        db.stats.total_biomes
    );
    Ok((index, db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigManager, ExclusionPolicy, LocationMatchMode};
    use crate::rule::SpawnRule;
    use crate::tag::{TagEntry, TagGraph};
    use serde_json::{Value, json};

    fn rules(values: Vec<Value>) -> Vec<SpawnRule> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn test_run_merges_and_reduces() {
        // 测试场景：同签名规则合并，随后泛化规则被移除，ID重新编号
        let pipeline = SpawnPipeline::new(GlobalConfig::default());
        let mut raw = RawEntityRules::new();
        raw.insert(
            "hoothoot".to_string(),
            rules(vec![
                json!({ "id": "a", "weight": 4.0, "condition": { "biomes": ["minecraft:forest"] } }),
                json!({ "id": "b", "weight": 2.0, "condition": { "biomes": ["minecraft:forest"], "timeRange": "night" } }),
                json!({ "id": "c", "weight": 6.0, "condition": { "biomes": ["minecraft:forest"] } }),
            ]),
        );

        let output = pipeline.run(raw);
        let kept = &output.table["hoothoot"];
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "hoothoot-0");
        assert_eq!(kept[0].weight, Some(2.0));
        assert_eq!(output.stats.merged_rules, 2);
        assert_eq!(output.stats.redundant_removed, 1);
        assert_eq!(output.stats.rules_out, 1);
    }

    #[test]
    fn test_excluded_and_empty_entities_absent() {
        // 测试场景：排除名单命中的实体和没有规则的实体都不出现在输出中
        let pipeline = SpawnPipeline::new(GlobalConfig::default());
        let mut raw = RawEntityRules::new();
        raw.insert("cobblemon:mewtwo".to_string(), rules(vec![json!({ "id": "m" })]));
        raw.insert("ghost".to_string(), Vec::new());
        raw.insert("pidgey".to_string(), rules(vec![json!({ "id": "p" })]));

        let output = pipeline.run(raw);
        assert_eq!(output.table.keys().collect::<Vec<_>>(), vec!["pidgey"]);
        assert_eq!(output.stats.entities_in, 3);
        assert_eq!(output.stats.entities_excluded, 1);
        assert_eq!(output.stats.entities_out, 1);
    }

    #[test]
    fn test_unify_keeps_generalizations() {
        // 测试场景：仅合并时不做冗余消除
        let config = ConfigManager::custom().exclusion(ExclusionPolicy::None).build();
        let pipeline = SpawnPipeline::new(config);
        let mut raw = RawEntityRules::new();
        raw.insert(
            "e".to_string(),
            rules(vec![
                json!({ "condition": { "biomes": ["x"] } }),
                json!({ "condition": { "biomes": ["x"], "weather": "rain" } }),
            ]),
        );

        let output = pipeline.unify(raw);
        assert_eq!(output.table["e"].len(), 2);
        assert_eq!(output.stats.redundant_removed, 0);
    }

    #[test]
    fn test_clean_keeps_ids_scheme_and_skips_merge() {
        // 测试场景：清理阶段不合并（签名相同的规则不会合并），只做冗余消除
        let pipeline = SpawnPipeline::new(GlobalConfig::default());
        let mut table = EntityRuleTable::new();
        table.insert(
            "e".to_string(),
            rules(vec![
                json!({ "id": "e-0", "weight": 1.0, "condition": { "biomes": ["x"], "timeRange": "day" } }),
                json!({ "id": "e-1", "weight": 3.0, "condition": { "biomes": ["y"], "timeRange": "day" } }),
            ]),
        );

        let output = pipeline.clean(table);
        let kept = &output.table["e"];
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].weight, Some(3.0));
        assert_eq!(output.stats.merged_rules, 0);
    }

    #[test]
    fn test_clean_after_unify_uses_file_stem_ids() {
        // 测试场景：内存中合并后直接清理，与写出再读取的数据包使用相同的实体名和ID
        let pipeline = SpawnPipeline::new(GlobalConfig::default());
        let mut raw = RawEntityRules::new();
        raw.insert(
            "Raichu Alolan".to_string(),
            rules(vec![json!({ "condition": { "biomes": ["minecraft:jungle"] } })]),
        );

        let unified = pipeline.unify(raw);
        assert_eq!(unified.table["Raichu Alolan"][0].id, "Raichu Alolan-0");

        let cleaned = pipeline.clean(key_by_file_stem(unified.table));
        assert_eq!(cleaned.table.keys().collect::<Vec<_>>(), vec!["raichu_alolan"]);
        assert_eq!(cleaned.table["raichu_alolan"][0].id, "raichu_alolan-0");
    }

    #[test]
    fn test_resolved_mode_uses_tag_index() {
        // 测试场景：附加标签索引后，标签规则被视为具体规则的泛化
        let graph: TagGraph = [(
            "minecraft:is_forest".to_string(),
            vec![TagEntry::Id("minecraft:forest".to_string())],
        )]
        .into_iter()
        .collect();
        let index = ResolvedTagIndex::build(&graph, IdNormalizer::default());
        let config = ConfigManager::custom()
            .location_match(LocationMatchMode::Resolved)
            .build();
        let pipeline = SpawnPipeline::new(config).with_tag_index(index);

        let mut table = EntityRuleTable::new();
        table.insert(
            "e".to_string(),
            rules(vec![
                json!({ "condition": { "biomes": ["#minecraft:is_forest"] } }),
                json!({ "condition": { "biomes": ["minecraft:forest"], "canSeeSky": true } }),
            ]),
        );

        let output = pipeline.clean(table);
        assert_eq!(output.table["e"].len(), 1);
        assert_eq!(output.table["e"][0].location_groups(), ["minecraft:forest"]);
    }

    #[tokio::test]
    async fn test_build_and_reload_tag_index() {
        // 测试场景：扫描标签文件构建索引，保存后可从数据库恢复
        let tmp = tempfile::tempdir().unwrap();
        let tag_dir = tmp.path().join("mods/m/data/minecraft/tags/worldgen/biome");
        std::fs::create_dir_all(&tag_dir).unwrap();
        std::fs::write(tag_dir.join("is_forest.json"), r##"{"values": ["forest", "#is_taiga"]}"##).unwrap();
        std::fs::write(tag_dir.join("is_taiga.json"), r#"{"values": ["taiga"]}"#).unwrap();

        let config = ConfigManager::custom()
            .root_dir(tmp.path().to_path_buf())
            .output_dir(tmp.path().join("out"))
            .build();

        let (index, db) = build_tag_index(&config).await.unwrap();
        let forest = index.get("minecraft:is_forest").unwrap();
        assert!(forest.contains("minecraft:taiga"));
        assert_eq!(db.stats.total_tags, 2);

        crate::rule::PackWriter::new(&config).write_biome_database(&db).await.unwrap();
        let reloaded = load_tag_index(&config).await.unwrap();
        assert_eq!(reloaded, index);
    }
}
