//! Report Exporter Port - 报告本地导出（下载）

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::analysis::AnalysisResult;
use crate::domain::report::ComposedReport;

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
}

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Result<Self, ExportError> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }

    /// 按文件扩展名推断格式
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| Self::from_str(e).ok())
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// 待导出的报告
#[derive(Debug, Clone)]
pub struct ExportDocument {
    pub task_id: String,
    pub analysis: AnalysisResult,
    pub report: ComposedReport,
}

/// Report Exporter Port
#[async_trait]
pub trait ReportExporterPort: Send + Sync {
    /// 写出报告，返回实际写入的路径
    async fn export(
        &self,
        document: &ExportDocument,
        path: &Path,
        format: ExportFormat,
    ) -> Result<PathBuf, ExportError>;
}
