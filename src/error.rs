//! 全局错误类型定义

use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;
use walkdir::Error as WalkDirError;

#[derive(Error, Debug)]
pub enum RspawnError {
    // 规则相关错误
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),
    #[error("规则解析失败：{0}")]
    RuleParseError(String),

    // 标签相关错误
    #[error("标签解析失败：{0}")]
    TagParseError(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("目录遍历失败：{0}")]
    WalkDirError(#[from] WalkDirError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type RspResult<T> = Result<T, RspawnError>;
