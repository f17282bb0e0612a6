//! Report Command Handlers

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

use crate::application::commands::{ExportReportCommand, SaveReportCommand};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AuthContext, DiagnosisApiPort, DiagnosisRecord, ExportDocument, ExportFormat,
    ReportExporterPort, SavedReport,
};

/// SaveReport Handler - 打包图片、分析结果与报告并保存到后端
pub struct SaveReportHandler {
    api: Arc<dyn DiagnosisApiPort>,
    auth: Arc<dyn AuthContext>,
}

impl SaveReportHandler {
    pub fn new(api: Arc<dyn DiagnosisApiPort>, auth: Arc<dyn AuthContext>) -> Self {
        Self { api, auth }
    }

    pub async fn handle(&self, cmd: SaveReportCommand) -> Result<SavedReport, ApplicationError> {
        let analysis = cmd
            .task
            .result()
            .cloned()
            .ok_or_else(|| ApplicationError::invalid_state("Task has no analysis result"))?;

        let user_id = self
            .auth
            .ready_user()
            .ok_or(ApplicationError::Unauthenticated)?;

        let record = DiagnosisRecord {
            user_id,
            task_id: cmd.task.task_id().clone(),
            image_base64: cmd.image.to_base64(),
            image_mime_type: cmd.image.mime_type().to_string(),
            analysis,
            report: cmd.report,
            additional_info: cmd.additional_info,
            created_at: Utc::now(),
        };

        let saved = self.api.save_report(record).await?;

        tracing::info!(
            task_id = %cmd.task.task_id(),
            report_id = %saved.report_id,
            "Report saved"
        );
        Ok(saved)
    }
}

/// ExportReport Handler - 将报告写到本地文件
pub struct ExportReportHandler {
    exporter: Arc<dyn ReportExporterPort>,
}

impl ExportReportHandler {
    pub fn new(exporter: Arc<dyn ReportExporterPort>) -> Self {
        Self { exporter }
    }

    pub async fn handle(&self, cmd: ExportReportCommand) -> Result<PathBuf, ApplicationError> {
        let analysis = cmd
            .task
            .result()
            .cloned()
            .ok_or_else(|| ApplicationError::invalid_state("Task has no analysis result"))?;

        let format = cmd
            .format
            .or_else(|| ExportFormat::from_path(&cmd.path))
            .unwrap_or(ExportFormat::Json);

        let document = ExportDocument {
            task_id: cmd.task.task_id().to_string(),
            analysis,
            report: cmd.report,
        };

        let written = self.exporter.export(&document, &cmd.path, format).await?;
        tracing::info!(path = %written.display(), format = ?format, "Report exported");
        Ok(written)
    }
}
