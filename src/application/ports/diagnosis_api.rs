//! Diagnosis API Port - 后端诊断服务抽象
//!
//! 定义对后端 REST / 推送通道的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

use crate::domain::analysis::{AnalysisResult, StatusObservation, TaskId};
use crate::domain::intake::{AdditionalInfo, ImageUpload};
use crate::domain::report::{ComposedReport, ReportEvent};

/// Gateway 错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Stream error: {0}")]
    StreamError(String),
}

impl GatewayError {
    /// 传输层错误（网络不可达、超时）
    ///
    /// 轮询时视为"仍在进行中"，一次性请求直接上抛
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::NetworkError(_) | GatewayError::Timeout)
    }
}

/// 提交分析请求
#[derive(Debug, Clone)]
pub struct SubmitAnalysisRequest {
    pub user_id: String,
    pub image: ImageUpload,
    pub additional_info: Option<AdditionalInfo>,
}

/// 打开报告推送通道的参数
///
/// 图片由 task_id 在后端侧定位，不再重复上传
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStreamRequest {
    pub user_id: String,
    pub task_id: TaskId,
    pub disease_name: String,
}

/// 保存到后端的诊断记录
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisRecord {
    pub user_id: String,
    pub task_id: TaskId,
    /// base64 编码的原图
    pub image_base64: String,
    pub image_mime_type: String,
    pub analysis: AnalysisResult,
    pub report: ComposedReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<AdditionalInfo>,
    pub created_at: DateTime<Utc>,
}

/// 保存结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReport {
    pub report_id: String,
}

/// 推送通道上的事件流，按到达顺序产出
pub type ReportEventStream = BoxStream<'static, Result<ReportEvent, GatewayError>>;

/// Diagnosis API Port
///
/// 所有调用都必须在有限时间内完成或失败
#[async_trait]
pub trait DiagnosisApiPort: Send + Sync {
    /// 上传图片（及问卷），返回后端任务 ID
    async fn submit_analysis(&self, request: SubmitAnalysisRequest) -> Result<TaskId, GatewayError>;

    /// 查询任务状态
    async fn task_status(&self, task_id: &TaskId) -> Result<StatusObservation, GatewayError>;

    /// 打开报告推送通道
    async fn open_report_stream(
        &self,
        request: ReportStreamRequest,
    ) -> Result<ReportEventStream, GatewayError>;

    /// 保存完成的诊断记录
    async fn save_report(&self, record: DiagnosisRecord) -> Result<SavedReport, GatewayError>;
}
