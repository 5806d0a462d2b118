//! 规则模块：数据模型、采集与输出

pub mod loader;
pub mod model;
pub mod writer;

pub use self::loader::{CollectStats, CollectedRules, EntityNaming, RuleCollector, RuleLoader};
pub use self::model::{
    DEFAULT_CONTEXT, EntityRuleTable, RawEntityRules, SpawnCondition, SpawnPoolFile, SpawnRule,
};
pub use self::writer::PackWriter;
