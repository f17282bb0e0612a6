//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod auth;
mod diagnosis_api;
mod report_exporter;

pub use auth::AuthContext;
pub use diagnosis_api::{
    DiagnosisApiPort, DiagnosisRecord, GatewayError, ReportEventStream, ReportStreamRequest,
    SavedReport, SubmitAnalysisRequest,
};
pub use report_exporter::{ExportDocument, ExportError, ExportFormat, ReportExporterPort};
