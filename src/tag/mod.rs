//! 标签模块：生物群系标签图的构建与递归展开
pub mod graph;
pub mod resolver;

pub use self::graph::{TagEntry, TagGraph};
pub use self::resolver::{BiomeDatabase, DatabaseStats, ResolvedTagIndex, TagResolver};
