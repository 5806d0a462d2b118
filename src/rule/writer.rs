//! 数据包输出
//! 所有输出文件名都经过 `FilenameSanitizer` 清洗

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use super::model::{EntityRuleTable, SpawnPoolFile};
use crate::config::GlobalConfig;
use crate::error::RspResult;
use crate::tag::BiomeDatabase;
use crate::utils::FilenameSanitizer;

/// 数据包写入器
pub struct PackWriter<'a> {
    config: &'a GlobalConfig,
}

impl<'a> PackWriter<'a> {
    pub fn new(config: &'a GlobalConfig) -> Self {
        Self { config }
    }

    /// 写入规则数据包：`<output>/<pack>/data/<ns>/<spawn_dir>/<entity>.json`
    /// 返回数据包根目录
    pub async fn write_spawn_pack(
        &self,
        pack_name: &str,
        description: &str,
        table: &EntityRuleTable,
    ) -> RspResult<PathBuf> {
        let pack_dir = self.config.output_dir.join(pack_name);
        let spawn_dir = pack_dir
            .join("data")
            .join(&self.config.entity_namespace)
            .join(&self.config.spawn_dir_marker);
        tokio::fs::create_dir_all(&spawn_dir).await?;
        self.write_pack_meta(&pack_dir, description).await?;

        for (entity, rules) in table {
            let file_name = FilenameSanitizer::sanitize(&format!("{}.json", entity));
            let file = SpawnPoolFile::enabled(rules.clone());
            Self::write_json(&spawn_dir.join(file_name), &file).await?;
        }
        info!("数据包写入完成：{}（{} 个实体）", pack_dir.display(), table.len());
        Ok(pack_dir)
    }

    /// 写入屏蔽包：对每个来源路径写入一份禁用文件
    /// 文件名含忽略关键字（NPC、结构等）的来源保持原样，返回写入文件数
    pub async fn write_blocker_pack(&self, sources: &BTreeSet<String>) -> RspResult<usize> {
        let targets: Vec<&String> = sources
            .iter()
            .filter(|source| {
                let ignored = self.is_blocker_ignored(source);
                if ignored {
                    debug!("屏蔽包跳过：{}", source);
                }
                !ignored
            })
            .collect();
        self.write_disabled_pack(&self.config.blocker_pack_name, "Blocks all original spawn files", targets)
            .await
    }

    /// 写入传说保护包：屏蔽所有命中排除关键字的来源文件
    /// 需在数据包列表中最后加载，覆盖其他数据包重新启用的规则
    pub async fn write_legendary_blocker(&self, protected: &BTreeSet<String>) -> RspResult<usize> {
        self.write_disabled_pack(&self.config.legendary_pack_name, "Legendary spawn protection", protected.iter())
            .await
    }

    async fn write_disabled_pack<'s>(
        &self,
        pack_name: &str,
        description: &str,
        sources: impl IntoIterator<Item = &'s String>,
    ) -> RspResult<usize> {
        let pack_dir = self.config.output_dir.join(pack_name);
        tokio::fs::create_dir_all(&pack_dir).await?;
        self.write_pack_meta(&pack_dir, description).await?;

        let blocker = SpawnPoolFile::blocker();
        let mut written = 0;
        for source in sources {
            let target = pack_dir.join(FilenameSanitizer::sanitize_path(Path::new(source)));
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            Self::write_json(&target, &blocker).await?;
            written += 1;
        }
        info!("屏蔽文件写入完成：{}（{} 个文件）", pack_dir.display(), written);
        Ok(written)
    }

    /// 写入生物群系数据库
    pub async fn write_biome_database(&self, db: &BiomeDatabase) -> RspResult<PathBuf> {
        let path = self.config.output_dir.join(&self.config.biome_database_file);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Self::write_json(&path, db).await?;
        info!(
            "生物群系数据库已保存：{}（标签 {}，生物群系 {}）",
            path.display(),
            db.stats.total_tags,
            db.stats.total_biomes
        );
        Ok(path)
    }

    fn is_blocker_ignored(&self, source: &str) -> bool {
        let lower = Path::new(source)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(source)
            .to_lowercase();
        self.config
            .blocker_ignored_keywords
            .iter()
            .any(|k| lower.contains(k.as_str()))
    }

    async fn write_pack_meta(&self, pack_dir: &Path, description: &str) -> RspResult<()> {
        let meta = json!({
            "pack": {
                "pack_format": self.config.pack_format,
                "description": description,
            }
        });
        Self::write_json(&pack_dir.join("pack.mcmeta"), &meta).await
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> RspResult<()> {
        let data = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }
}
