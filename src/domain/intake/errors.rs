//! Intake Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("未选择图片")]
    MissingImage,

    #[error("图片内容为空: {0}")]
    EmptyImage(String),

    #[error("不支持的图片格式: {0}")]
    UnsupportedFormat(String),

    #[error("图片过大: {size} 字节，上限 {limit} 字节")]
    ImageTooLarge { size: u64, limit: u64 },

    #[error("问卷缺少必填项: {0}")]
    MissingField(&'static str),

    #[error("无效的问卷内容: {0}")]
    InvalidAnswer(String),
}
