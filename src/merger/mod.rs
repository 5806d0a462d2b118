//! 合并模块：规则签名、语义合并、冗余消除
pub mod canonical;
pub mod merge;
pub mod reducer;
pub mod stats;

pub use self::canonical::RuleCanonicalizer;
pub use self::merge::{MergeEngine, RuleGroup};
pub use self::reducer::RedundancyReducer;
pub use self::stats::MergeStats;
