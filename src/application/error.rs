//! 应用层错误定义
//!
//! 统一的命令/流程错误类型

use thiserror::Error;

use crate::application::ports::{ExportError, GatewayError};
use crate::domain::intake::IntakeError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 验证错误（不会发送到后端）
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 身份信息未就绪或未登录
    #[error("Not signed in")]
    Unauthenticated,

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 后端调用失败
    #[error("External service error: {0}")]
    ExternalServiceError(#[from] GatewayError),

    /// 本地导出失败
    #[error("Export error: {0}")]
    ExportError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 后端返回的 HTTP 状态码（若有）
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::ExternalServiceError(GatewayError::HttpError { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

impl From<IntakeError> for ApplicationError {
    fn from(err: IntakeError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<ExportError> for ApplicationError {
    fn from(err: ExportError) -> Self {
        Self::ExportError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_passthrough() {
        let err = ApplicationError::from(GatewayError::HttpError {
            status: 503,
            body: "busy".to_string(),
        });
        assert_eq!(err.http_status(), Some(503));
        assert_eq!(ApplicationError::Unauthenticated.http_status(), None);
    }

    #[test]
    fn test_intake_error_is_validation() {
        let err = ApplicationError::from(IntakeError::MissingImage);
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }
}
