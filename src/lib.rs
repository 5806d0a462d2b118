//! rspawnpool - 刷怪规则合并去重工具
//! 展开生物群系标签图，合并并精简来自多个模组/数据包的刷怪规则

// 导出全局错误类型
pub use self::error::{RspawnError, RspResult};

// 导出配置模块
pub use self::config::{
    ConfigManager, CustomConfigBuilder, ExclusionPolicy, GlobalConfig, LocationMatchMode, SpecificityWeights,
};

// 导出标签模块核心接口
pub use self::tag::{BiomeDatabase, ResolvedTagIndex, TagEntry, TagGraph, TagResolver};

// 导出规则模块核心接口
pub use self::rule::{
    CollectStats, CollectedRules, EntityRuleTable, PackWriter, RawEntityRules, RuleCollector, RuleLoader,
    SpawnCondition, SpawnPoolFile, SpawnRule,
};

// 导出合并模块核心接口
pub use self::merger::{MergeEngine, MergeStats, RedundancyReducer, RuleCanonicalizer};

// 导出工具模块核心接口
pub use self::utils::{FilenameSanitizer, IdNormalizer};

// 导出流水线
pub use self::pipeline::{PipelineOutput, SpawnPipeline, build_tag_index, key_by_file_stem, load_tag_index};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod merger;
pub mod pipeline;
pub mod rule;
pub mod tag;
pub mod utils;
