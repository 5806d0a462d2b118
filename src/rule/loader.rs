//! 规则采集管理器
//! 负责从模组/数据包目录中收集刷怪规则与生物群系标签定义
//! 单条记录或单个文件损坏只会被跳过，不会中断整批采集

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::model::{RawEntityRules, SpawnRule};
use crate::config::GlobalConfig;
use crate::error::{RspResult, RspawnError};
use crate::tag::{BiomeDatabase, TagGraph};
use crate::utils::{FilenameSanitizer, IdNormalizer};

/// 执行上下文的旧字段名
const LEGACY_CONTEXT_FIELD: &str = "spawnablePositionType";

/// 实体命名方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityNaming {
    /// 优先取首条规则的 pokemon 字段，其次取文件名
    FromContent,
    /// 直接使用文件名（已合并的数据包）
    FromFileStem,
}

/// 采集统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectStats {
    /// 扫描到的规则文件数
    pub files_scanned: u32,
    /// 贡献了规则的文件数
    pub files_collected: u32,
    /// 无法解析或被禁用而跳过的文件数
    pub files_skipped: u32,
    /// 采集到的规则数
    pub records_collected: u32,
    /// 格式错误而跳过的规则数
    pub records_skipped: u32,
    /// 标签文件数
    pub tag_files: u32,
    /// 跳过的标签文件数
    pub tag_files_skipped: u32,
}

impl CollectStats {
    pub fn print_stats(&self) {
        tracing::info!(
            "规则采集完成 | 文件: 扫描 {} 采集 {} 跳过 {} | 规则: 采集 {} 跳过 {}",
            self.files_scanned,
            self.files_collected,
            self.files_skipped,
            self.records_collected,
            self.records_skipped
        );
        if self.tag_files > 0 || self.tag_files_skipped > 0 {
            tracing::info!(
                "标签采集完成 | 文件: 读取 {} 跳过 {}",
                self.tag_files,
                self.tag_files_skipped
            );
        }
    }
}

/// 采集结果
#[derive(Debug, Default, Clone)]
pub struct CollectedRules {
    /// 实体 -> 原始规则
    pub rules: RawEntityRules,
    /// 所有扫描到的规则文件（从 `data/` 开始的相对路径），不论内容是否有效
    pub sources: BTreeSet<String>,
    /// 文件名或规则实体命中排除关键字的来源文件，供保护包屏蔽
    pub protected: BTreeSet<String>,
    pub stats: CollectStats,
}

/// 规则采集器（纯内存，不做IO）
#[derive(Debug)]
pub struct RuleCollector<'a> {
    config: &'a GlobalConfig,
    naming: EntityNaming,
    exclusion_keywords: Vec<String>,
    collected: CollectedRules,
}

impl<'a> RuleCollector<'a> {
    pub fn new(config: &'a GlobalConfig, naming: EntityNaming) -> Self {
        Self {
            config,
            naming,
            exclusion_keywords: config.exclusion.keywords(),
            collected: CollectedRules::default(),
        }
    }

    /// 采集单个文件的原始字节，返回采集到的规则数
    /// 压缩包读取等外部来源同样通过此入口送入
    /// 来源路径在解析之前登记，损坏的文件同样会被屏蔽包覆盖
    pub fn ingest_bytes(&mut self, source_path: &str, bytes: &[u8]) -> RspResult<usize> {
        self.collected.stats.files_scanned += 1;
        self.register_source(source_path);
        let data: Value = serde_json::from_slice(bytes).inspect_err(|_| {
            self.collected.stats.files_skipped += 1;
        })?;
        self.ingest_value(source_path, data)
    }

    /// 采集已解析的文件内容
    pub fn ingest_value(&mut self, source_path: &str, mut data: Value) -> RspResult<usize> {
        let relative = self.register_source(source_path);

        let Some(spawns) = data.get_mut("spawns").and_then(Value::as_array_mut) else {
            self.collected.stats.files_skipped += 1;
            return Err(RspawnError::RuleParseError(format!("缺少 spawns 列表：{}", source_path)));
        };
        let spawns = std::mem::take(spawns);

        if let Some(relative) = relative {
            if spawns.iter().any(|s| self.names_excluded_entity(s)) {
                self.collected.protected.insert(relative);
            }
        }

        if data.get("enabled").and_then(Value::as_bool) == Some(false) {
            debug!("规则文件已禁用，跳过：{}", source_path);
            self.collected.stats.files_skipped += 1;
            return Ok(0);
        }

        let entity = self.entity_name(source_path, &spawns);
        let mut accepted = Vec::with_capacity(spawns.len());
        for mut record in spawns {
            if let Some(obj) = record.as_object_mut() {
                if let Some(legacy) = obj.remove(LEGACY_CONTEXT_FIELD) {
                    obj.insert("context".to_string(), legacy);
                }
            }
            match serde_json::from_value::<SpawnRule>(record) {
                Ok(rule) => accepted.push(rule),
                Err(e) => {
                    debug!("跳过格式错误的规则（{}）：{}", source_path, e);
                    self.collected.stats.records_skipped += 1;
                }
            }
        }

        let count = accepted.len();
        if count > 0 {
            self.collected.stats.files_collected += 1;
            self.collected.stats.records_collected += count as u32;
            self.collected.rules.entry(entity).or_default().extend(accepted);
        }
        Ok(count)
    }

    pub fn finish(self) -> CollectedRules {
        self.collected
    }

    /// 登记来源路径；不在 `data/` 下的文件无法被数据包覆盖，不登记
    /// 文件名命中排除关键字时同时登记为受保护来源
    fn register_source(&mut self, source_path: &str) -> Option<String> {
        let relative = FilenameSanitizer::data_relative(source_path)?;
        let file_name = Self::file_name(source_path).to_lowercase();
        if self.exclusion_keywords.iter().any(|k| file_name.contains(k.as_str())) {
            self.collected.protected.insert(relative.clone());
        }
        self.collected.sources.insert(relative.clone());
        Some(relative)
    }

    /// 规则的 pokemon 字段（去命名空间、小写）是否命中排除关键字
    fn names_excluded_entity(&self, record: &Value) -> bool {
        let Some(pokemon) = record.get("pokemon").and_then(Value::as_str) else {
            return false;
        };
        let lower = pokemon.to_lowercase();
        let name = IdNormalizer::strip_namespace(&lower, &self.config.entity_namespace);
        self.exclusion_keywords.iter().any(|k| name.contains(k.as_str()))
    }

    fn file_name(source_path: &str) -> &str {
        Path::new(source_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(source_path)
    }

    fn entity_name(&self, source_path: &str, spawns: &[Value]) -> String {
        let file_name = Self::file_name(source_path);

        match self.naming {
            EntityNaming::FromFileStem => file_name.strip_suffix(".json").unwrap_or(file_name).to_string(),
            EntityNaming::FromContent => spawns
                .first()
                .and_then(|s| s.get("pokemon"))
                .and_then(Value::as_str)
                .map(|p| IdNormalizer::strip_namespace(p, &self.config.entity_namespace).to_string())
                .unwrap_or_else(|| FilenameSanitizer::entity_from_filename(file_name)),
        }
    }
}

/// 规则加载管理器
/// 负责目录遍历与文件读取，解析交给 `RuleCollector` / `TagGraph`
pub struct RuleLoader;

impl RuleLoader {
    /// 扫描所有来源目录中的刷怪规则文件
    pub async fn collect(config: &GlobalConfig) -> RspResult<CollectedRules> {
        let marker = format!("/{}/", config.spawn_dir_marker.trim_matches('/'));
        let files = Self::find_json_files(&config.source_paths(), &marker);
        debug!("发现刷怪规则文件 {} 个", files.len());

        let mut collector = RuleCollector::new(config, EntityNaming::FromContent);
        Self::feed(&mut collector, &files).await?;
        Ok(collector.finish())
    }

    /// 读取已合并的数据包（实体名取自文件名）
    pub async fn load_pack(config: &GlobalConfig, pack_dir: &Path) -> RspResult<CollectedRules> {
        if !pack_dir.exists() {
            return Err(RspawnError::RuleLoadError(format!(
                "数据包目录不存在：{}",
                pack_dir.display()
            )));
        }
        let marker = format!("/{}/", config.spawn_dir_marker.trim_matches('/'));
        let files = Self::find_json_files(&[pack_dir.to_path_buf()], &marker);

        let mut collector = RuleCollector::new(config, EntityNaming::FromFileStem);
        Self::feed(&mut collector, &files).await?;
        Ok(collector.finish())
    }

    /// 扫描所有来源目录中的生物群系标签定义
    pub async fn load_tag_graph(config: &GlobalConfig) -> RspResult<(TagGraph, CollectStats)> {
        let tag_dir = config.tag_dir_marker.trim_matches('/');
        let marker = format!("/{}/", tag_dir);
        let files = Self::find_json_files(&config.source_paths(), &marker);

        let mut graph = TagGraph::new();
        let mut stats = CollectStats::default();
        for file in files {
            let bytes = tokio::fs::read(&file).await?;
            let path = file.to_string_lossy();
            match graph.ingest_bytes(&path, tag_dir, &bytes) {
                Ok(_) => stats.tag_files += 1,
                Err(e) => {
                    debug!("跳过标签文件 {}：{}", path, e);
                    stats.tag_files_skipped += 1;
                }
            }
        }
        debug!("标签图构建完成，标签数：{}", graph.len());
        Ok((graph, stats))
    }

    /// 读取生物群系数据库
    pub async fn load_biome_database(path: &Path) -> RspResult<BiomeDatabase> {
        let data = tokio::fs::read(path).await?;
        let db: BiomeDatabase = serde_json::from_slice(&data)?;
        debug!(
            "生物群系数据库加载成功，标签数：{}，生物群系数：{}",
            db.tags.len(),
            db.biomes.len()
        );
        Ok(db)
    }

    async fn feed(collector: &mut RuleCollector<'_>, files: &[PathBuf]) -> RspResult<()> {
        for file in files {
            let bytes = tokio::fs::read(file).await?;
            let path = file.to_string_lossy();
            if let Err(e) = collector.ingest_bytes(&path, &bytes) {
                debug!("跳过规则文件 {}：{}", path, e);
            }
        }
        Ok(())
    }

    /// 递归查找路径中包含 `marker` 的 JSON 文件；不存在的目录直接忽略
    fn find_json_files(roots: &[PathBuf], marker: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in roots {
            if !root.exists() {
                debug!("来源目录不存在，跳过：{}", root.display());
                continue;
            }
            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("目录遍历出错，已跳过：{}", e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let normalized = path.to_string_lossy().replace('\\', "/");
                if normalized.ends_with(".json") && normalized.contains(marker) {
                    files.push(path.to_path_buf());
                }
            }
        }
        files
    }
}
