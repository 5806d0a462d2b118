//! 文件名处理工具
//! 输出文件名统一小写，仅保留 `[a-z0-9._-]`，避免游戏加载数据包时因非法字符崩溃

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

static INVALID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9._-]").unwrap());
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"__+").unwrap());
static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+_").unwrap());

/// 文件名处理工具
pub struct FilenameSanitizer;

impl FilenameSanitizer {
    /// 清洗单个文件名
    pub fn sanitize(name: &str) -> String {
        let lower = name.to_lowercase();
        let replaced = INVALID_CHARS.replace_all(&lower, "_");
        UNDERSCORE_RUNS.replace_all(&replaced, "_").into_owned()
    }

    /// 仅清洗路径的最后一段，目录部分保持原样
    pub fn sanitize_path(path: &Path) -> PathBuf {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => path.with_file_name(Self::sanitize(name)),
            None => path.to_path_buf(),
        }
    }

    /// 从规则文件名推断实体名：去掉 `.json` 与数字编号前缀，转小写
    /// 例：`0025_Pikachu.json` -> `pikachu`
    pub fn entity_from_filename(filename: &str) -> String {
        let stem = filename.strip_suffix(".json").unwrap_or(filename);
        NUMERIC_PREFIX.replace(stem, "").to_lowercase()
    }

    /// 截取从 `data/` 开始的相对路径（统一使用 `/` 分隔）
    pub fn data_relative(path: &str) -> Option<String> {
        let normalized = path.replace('\\', "/");
        let parts: Vec<&str> = normalized.split('/').collect();
        let idx = parts.iter().position(|p| *p == "data")?;
        Some(parts[idx..].join("/"))
    }
}
