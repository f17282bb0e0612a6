//! Report Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("未知的报告分节: {0}")]
    UnknownSection(String),

    #[error("报告已完成，不能再追加内容")]
    AlreadyComplete,

    #[error("报告尚未完成")]
    NotComplete,
}
