//! 工具模块：标识符规范化、文件名处理
pub mod filename;
pub mod id_normalizer;

pub use self::filename::FilenameSanitizer;
pub use self::id_normalizer::IdNormalizer;
