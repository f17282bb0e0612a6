//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（DiagnosisApi、AuthContext、ReportExporter）
//! - commands: 一次性写操作命令及处理器
//! - pipeline: 轮询、流式报告与向导状态机
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod pipeline;
pub mod ports;

// Re-exports
pub use commands::{
    handlers::{ExportReportHandler, SaveReportHandler, SubmitAnalysisHandler},
    ExportReportCommand, SaveReportCommand, SubmitAnalysisCommand,
};

pub use error::ApplicationError;

pub use pipeline::{
    poll_until_terminal, DiagnosisWizard, PollHandle, PollSchedule, ReportStreamClient,
    SaveOutcome, StreamHandle, StreamUpdate, WizardConfig, WizardSnapshot,
};

pub use ports::{
    AuthContext, DiagnosisApiPort, DiagnosisRecord, ExportDocument, ExportError, ExportFormat,
    GatewayError, ReportEventStream, ReportExporterPort, ReportStreamRequest, SavedReport,
    SubmitAnalysisRequest,
};
