//! Report Commands - 报告保存与导出命令

use std::path::PathBuf;

use crate::application::ports::ExportFormat;
use crate::domain::analysis::AnalysisTask;
use crate::domain::intake::{AdditionalInfo, ImageUpload};
use crate::domain::report::ComposedReport;

/// 保存报告命令
#[derive(Debug, Clone)]
pub struct SaveReportCommand {
    pub image: ImageUpload,
    pub task: AnalysisTask,
    pub report: ComposedReport,
    pub additional_info: Option<AdditionalInfo>,
}

/// 导出（下载）报告命令
#[derive(Debug, Clone)]
pub struct ExportReportCommand {
    pub task: AnalysisTask,
    pub report: ComposedReport,
    pub path: PathBuf,
    /// None 时按文件扩展名推断，默认 JSON
    pub format: Option<ExportFormat>,
}
