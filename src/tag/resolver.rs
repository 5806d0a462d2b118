//! 标签递归展开
//! 将可能带环的标签图展开为 标签 -> 具体位置集合 的扁平索引
//!
//! 环的处理：解析时维护访问栈，命中栈内标签的分支贡献空集。
//! 被环截断的中间结果不写入缓存，该标签作为入口被解析时会重新计算完整结果；
//! 只引用自身的环不算截断。

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::graph::TagGraph;
use crate::utils::IdNormalizer;

/// 标签解析器
#[derive(Debug)]
pub struct TagResolver<'g> {
    graph: &'g TagGraph,
    normalizer: IdNormalizer,
    // 已完成的解析结果
    cache: HashMap<String, BTreeSet<String>>,
    // 当前访问栈（下标即深度）
    stack: Vec<String>,
    // 遇到过的所有具体位置
    locations: BTreeSet<String>,
}

impl<'g> TagResolver<'g> {
    pub fn new(graph: &'g TagGraph, normalizer: IdNormalizer) -> Self {
        Self {
            graph,
            normalizer,
            cache: HashMap::new(),
            stack: Vec::new(),
            locations: BTreeSet::new(),
        }
    }

    /// 解析任意标识符（标签或具体位置）
    /// - 图中存在的标签：递归展开
    /// - 带前缀但图中不存在：空集（对应模组未安装，不视为错误）
    /// - 其余：视为具体位置，返回补全命名空间后的单元素集合
    pub fn resolve(&mut self, raw_id: &str) -> BTreeSet<String> {
        let normalized = self.normalizer.normalize(raw_id);
        let (is_tag, id) = self.normalizer.split_marker(&normalized);

        if self.graph.contains(id) {
            return self.resolve_tag(id).0;
        }
        if is_tag {
            return BTreeSet::new();
        }
        self.locations.insert(id.to_string());
        BTreeSet::from([id.to_string()])
    }

    /// 解析图中所有标签，生成扁平索引
    pub fn resolve_all(mut self) -> ResolvedTagIndex {
        let graph = self.graph;
        for tag_id in graph.tag_ids() {
            self.resolve_tag(tag_id);
        }

        let tags: BTreeMap<String, BTreeSet<String>> = self.cache.into_iter().collect();
        debug!(
            "标签解析完成：标签 {} 个，具体位置 {} 个",
            tags.len(),
            self.locations.len()
        );

        ResolvedTagIndex {
            tags,
            locations: self.locations,
            normalizer: self.normalizer,
        }
    }

    /// 已缓存的标签数
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// 返回（展开结果，被截断时命中的最浅栈深度）
    fn resolve_tag(&mut self, tag_id: &str) -> (BTreeSet<String>, Option<usize>) {
        if let Some(hit) = self.cache.get(tag_id) {
            return (hit.clone(), None);
        }
        if let Some(depth) = self.stack.iter().position(|t| t == tag_id) {
            return (BTreeSet::new(), Some(depth));
        }

        let graph = self.graph;
        let depth = self.stack.len();
        self.stack.push(tag_id.to_string());

        let mut resolved = BTreeSet::new();
        let mut cut_at: Option<usize> = None;

        for entry in graph.entries(tag_id) {
            if entry.id().trim().is_empty() {
                continue;
            }
            let value = self.normalizer.normalize(entry.id());
            let (is_tag, target) = self.normalizer.split_marker(&value);

            if is_tag {
                if !graph.contains(target) {
                    continue;
                }
                let (nested, nested_cut) = self.resolve_tag(target);
                resolved.extend(nested);
                cut_at = match (cut_at, nested_cut) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
            } else {
                self.locations.insert(value.clone());
                resolved.insert(value);
            }
        }

        self.stack.pop();

        // 截断点在当前层及以下（自引用）时结果完整
        let cut_at = cut_at.filter(|d| *d < depth);
        if cut_at.is_none() {
            self.cache.insert(tag_id.to_string(), resolved.clone());
        }
        (resolved, cut_at)
    }
}

/// 扁平化后的标签索引
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTagIndex {
    tags: BTreeMap<String, BTreeSet<String>>,
    locations: BTreeSet<String>,
    normalizer: IdNormalizer,
}

impl ResolvedTagIndex {
    /// 直接构建整张图的索引
    pub fn build(graph: &TagGraph, normalizer: IdNormalizer) -> Self {
        TagResolver::new(graph, normalizer).resolve_all()
    }

    pub fn get(&self, tag_id: &str) -> Option<&BTreeSet<String>> {
        self.tags.get(tag_id)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn locations(&self) -> &BTreeSet<String> {
        &self.locations
    }

    /// 将规则中的位置组标识展开为具体位置集合（规则与 `TagResolver::resolve` 一致）
    pub fn expand(&self, raw_id: &str) -> BTreeSet<String> {
        let normalized = self.normalizer.normalize(raw_id);
        let (is_tag, id) = self.normalizer.split_marker(&normalized);
        match self.tags.get(id) {
            Some(set) => set.clone(),
            None if is_tag => BTreeSet::new(),
            None => BTreeSet::from([id.to_string()]),
        }
    }

    /// 展开一组位置组标识并取并集
    pub fn expand_all<'a>(&self, raw_ids: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
        raw_ids.into_iter().flat_map(|id| self.expand(id)).collect()
    }

    /// 转为可持久化的生物群系数据库
    pub fn to_database(&self) -> BiomeDatabase {
        BiomeDatabase {
            stats: DatabaseStats {
                total_tags: self.tags.len(),
                total_biomes: self.locations.len(),
            },
            biomes: self.locations.iter().cloned().collect(),
            tags: self
                .tags
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
                .collect(),
        }
    }

    /// 从生物群系数据库恢复索引
    pub fn from_database(db: BiomeDatabase, normalizer: IdNormalizer) -> Self {
        Self {
            tags: db
                .tags
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect()))
                .collect(),
            locations: db.biomes.into_iter().collect(),
            normalizer,
        }
    }
}

/// 生物群系数据库统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_tags: usize,
    pub total_biomes: usize,
}

/// 生物群系数据库（biome_database.json）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomeDatabase {
    #[serde(default)]
    pub stats: DatabaseStats,
    #[serde(default)]
    pub biomes: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagEntry;

    fn ids(list: &[&str]) -> Vec<TagEntry> {
        list.iter().map(|s| TagEntry::Id(s.to_string())).collect()
    }

    fn set(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_nested_tag() {
        // 测试场景：t1 -> [plains, #t2]，t2 -> [forest]
        let graph: TagGraph = [
            ("minecraft:t1".to_string(), ids(&["minecraft:plains", "#minecraft:t2"])),
            ("minecraft:t2".to_string(), ids(&["minecraft:forest"])),
        ]
        .into_iter()
        .collect();

        let mut resolver = TagResolver::new(&graph, IdNormalizer::default());
        assert_eq!(
            resolver.resolve("#minecraft:t1"),
            set(&["minecraft:plains", "minecraft:forest"])
        );
        // 子标签在父标签解析时已缓存
        assert_eq!(resolver.cached_len(), 2);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        // 测试场景：同一标签解析两次结果一致
        let graph: TagGraph = [(
            "minecraft:t1".to_string(),
            ids(&["plains", "#t2"]),
        ), (
            "minecraft:t2".to_string(),
            ids(&["forest"]),
        )]
        .into_iter()
        .collect();

        let mut resolver = TagResolver::new(&graph, IdNormalizer::default());
        let first = resolver.resolve("#t1");
        let second = resolver.resolve("#t1");
        assert_eq!(first, second);
        assert_eq!(first, set(&["minecraft:plains", "minecraft:forest"]));
    }

    #[test]
    fn test_resolve_mutual_cycle_terminates() {
        // 测试场景：A -> B，B -> A，两个入口都得到完整的并集
        let graph: TagGraph = [
            ("x:a".to_string(), ids(&["x:one", "#x:b"])),
            ("x:b".to_string(), ids(&["x:two", "#x:a"])),
        ]
        .into_iter()
        .collect();

        let index = ResolvedTagIndex::build(&graph, IdNormalizer::default());
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("x:a"), Some(&set(&["x:one", "x:two"])));
        assert_eq!(index.get("x:b"), Some(&set(&["x:one", "x:two"])));
    }

    #[test]
    fn test_resolve_self_cycle() {
        // 测试场景：标签引用自身
        let graph: TagGraph = [("x:a".to_string(), ids(&["#x:a", "x:one"]))]
            .into_iter()
            .collect();

        let mut resolver = TagResolver::new(&graph, IdNormalizer::default());
        assert_eq!(resolver.resolve("#x:a"), set(&["x:one"]));
        assert_eq!(resolver.cached_len(), 1);
    }

    #[test]
    fn test_truncated_nested_result_not_cached() {
        // 测试场景：从 A 进入时 B 被环截断，B 不应以残缺结果进入缓存
        let graph: TagGraph = [
            ("x:a".to_string(), ids(&["x:one", "#x:b"])),
            ("x:b".to_string(), ids(&["x:two", "#x:a"])),
        ]
        .into_iter()
        .collect();

        let mut resolver = TagResolver::new(&graph, IdNormalizer::default());
        resolver.resolve("#x:a");
        assert_eq!(resolver.cached_len(), 1);
        assert_eq!(resolver.resolve("#x:b"), set(&["x:one", "x:two"]));
    }

    #[test]
    fn test_unknown_tag_and_concrete_ids() {
        // 测试场景：未知标签为空集；未知裸标识视为具体位置并补全命名空间
        let graph: TagGraph = [(
            "x:a".to_string(),
            vec![
                TagEntry::Record { id: "#mod:missing".to_string(), required: Some(false) },
                TagEntry::Record { id: "badlands".to_string(), required: None },
            ],
        )]
        .into_iter()
        .collect();

        let mut resolver = TagResolver::new(&graph, IdNormalizer::default());
        assert!(resolver.resolve("#mod:missing").is_empty());
        assert_eq!(resolver.resolve("plains"), set(&["minecraft:plains"]));
        assert_eq!(resolver.resolve("#x:a"), set(&["minecraft:badlands"]));
    }

    #[test]
    fn test_index_expand_and_database_roundtrip() {
        // 测试场景：索引展开规则中的标识，并经数据库格式还原
        let graph: TagGraph = [("c:is_hot".to_string(), ids(&["desert", "badlands"]))]
            .into_iter()
            .collect();
        let index = ResolvedTagIndex::build(&graph, IdNormalizer::default());

        assert_eq!(index.expand("#c:is_hot"), set(&["minecraft:desert", "minecraft:badlands"]));
        assert_eq!(index.expand("jungle"), set(&["minecraft:jungle"]));
        assert!(index.expand("#c:unknown").is_empty());

        let db = index.to_database();
        assert_eq!(db.stats.total_tags, 1);
        assert_eq!(db.biomes, vec!["minecraft:badlands", "minecraft:desert"]);

        let json = serde_json::to_string(&db).unwrap();
        let back: BiomeDatabase = serde_json::from_str(&json).unwrap();
        let restored = ResolvedTagIndex::from_database(back, IdNormalizer::default());
        assert_eq!(restored, index);
    }
}
