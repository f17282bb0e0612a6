//! File Report Exporter - 文件系统报告导出实现
//!
//! 实现 ReportExporterPort trait

use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{ExportDocument, ExportError, ExportFormat, ReportExporterPort};
use crate::domain::report::ReportSection;

/// 文件系统报告导出
#[derive(Debug, Default, Clone)]
pub struct FileReportExporter;

impl FileReportExporter {
    pub fn new() -> Self {
        Self
    }

    /// 渲染 JSON 文档
    fn render_json(document: &ExportDocument) -> Result<Vec<u8>, ExportError> {
        let value = serde_json::json!({
            "task_id": document.task_id,
            "analysis": document.analysis,
            "report": document.report,
        });
        serde_json::to_vec_pretty(&value).map_err(|e| ExportError::Serialization(e.to_string()))
    }

    /// 渲染 Markdown 文档
    fn render_markdown(document: &ExportDocument) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}", document.analysis.disease_name());
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Confidence: {:.1}%  ",
            document.analysis.confidence()
        );
        let _ = writeln!(out, "Task: `{}`", document.task_id);

        for section in ReportSection::ALL {
            let text = document.report.section(section).trim();
            if text.is_empty() {
                continue;
            }
            let _ = write!(out, "\n## {}\n\n{}\n", section.title(), text);
        }
        out
    }
}

#[async_trait]
impl ReportExporterPort for FileReportExporter {
    async fn export(
        &self,
        document: &ExportDocument,
        path: &Path,
        format: ExportFormat,
    ) -> Result<PathBuf, ExportError> {
        let path = if path.extension().is_none() {
            path.with_extension(format.extension())
        } else {
            path.to_path_buf()
        };

        let bytes = match format {
            ExportFormat::Json => Self::render_json(document)?,
            ExportFormat::Markdown => Self::render_markdown(document).into_bytes(),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &bytes).await?;

        tracing::debug!(
            path = %path.display(),
            size = bytes.len(),
            "Report written"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::AnalysisResult;
    use crate::domain::report::StreamingReport;

    fn document() -> ExportDocument {
        let mut report = StreamingReport::new();
        report
            .append(ReportSection::Summary, "Mild psoriasis.")
            .unwrap();
        report
            .append(ReportSection::Management, "Topical steroids.")
            .unwrap();
        report.complete().unwrap();
        ExportDocument {
            task_id: "t-9".to_string(),
            analysis: AnalysisResult::new("Psoriasis", 64.25, Default::default()).unwrap(),
            report: report.compose().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_export_json_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out/report.json");

        let written = FileReportExporter::new()
            .export(&document(), &target, ExportFormat::Json)
            .await
            .unwrap();
        assert_eq!(written, target);

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&written).unwrap()).unwrap();
        assert_eq!(value["task_id"], "t-9");
        assert_eq!(value["analysis"]["disease_name"], "Psoriasis");
        assert_eq!(value["report"]["management"], "Topical steroids.");
    }

    #[tokio::test]
    async fn test_export_markdown_skips_empty_sections() {
        let dir = tempfile::tempdir().unwrap();
        let written = FileReportExporter::new()
            .export(&document(), &dir.path().join("report"), ExportFormat::Markdown)
            .await
            .unwrap();
        assert_eq!(written.extension().unwrap(), "md");

        let text = std::fs::read_to_string(written).unwrap();
        assert!(text.starts_with("# Psoriasis\n"));
        assert!(text.contains("Confidence: 64.2%") || text.contains("Confidence: 64.3%"));
        assert!(text.contains("## Summary\n\nMild psoriasis."));
        assert!(!text.contains("## Description"));
    }
}
