//! HTTP Diagnosis Client - 调用后端诊断服务
//!
//! 实现 DiagnosisApiPort trait
//!
//! 后端 API:
//! POST {base}/api/analysis/tasks          multipart(image, user_id, additional_info?) -> {"task_id"}
//! GET  {base}/api/analysis/tasks/{id}     -> {"state", "result"?, "error"?}
//! GET  {base}/api/reports/stream?...      text/event-stream
//! POST {base}/api/reports                 JSON DiagnosisRecord -> {"report_id"}

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::dto::{ReportStreamQuery, SaveReportResponse, SubmitTaskResponse, TaskStatusResponse};
use super::sse::decode_report_events;
use crate::application::ports::{
    DiagnosisApiPort, DiagnosisRecord, GatewayError, ReportEventStream, ReportStreamRequest,
    SavedReport, SubmitAnalysisRequest,
};
use crate::domain::analysis::{StatusObservation, TaskId};

/// API Key 请求头（X-API-Key）
pub const API_KEY_HEADER: &str = "x-api-key";

/// HTTP 诊断客户端配置
#[derive(Debug, Clone)]
pub struct HttpDiagnosisClientConfig {
    /// 后端基础 URL
    pub base_url: String,
    /// API Key，为空时不发送
    pub api_key: String,
    /// 请求超时时间（秒）；推送通道只约束建立连接
    pub timeout_secs: u64,
}

impl Default for HttpDiagnosisClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl HttpDiagnosisClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 诊断客户端
///
/// 普通请求使用带总超时的 client；推送通道使用不限总时长的 client
pub struct HttpDiagnosisClient {
    client: Client,
    stream_client: Client,
    config: HttpDiagnosisClientConfig,
}

impl HttpDiagnosisClient {
    /// 创建新的 HTTP 诊断客户端
    pub fn new(mut config: HttpDiagnosisClientConfig) -> Result<Self, GatewayError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let mut value = HeaderValue::from_str(&config.api_key)
                .map_err(|e| GatewayError::NetworkError(format!("Invalid API key: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        let client = Client::builder()
            .default_headers(headers.clone())
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        let stream_client = Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            stream_client,
            config,
        })
    }

    /// 使用默认配置创建客户端
    pub fn with_default_config() -> Result<Self, GatewayError> {
        Self::new(HttpDiagnosisClientConfig::default())
    }

    pub fn config(&self) -> &HttpDiagnosisClientConfig {
        &self.config
    }

    fn tasks_url(&self) -> String {
        format!("{}/api/analysis/tasks", self.config.base_url)
    }

    /// 任务 ID 作为单个路径段编码
    fn task_url(&self, task_id: &TaskId) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.tasks_url())
            .map_err(|e| GatewayError::NetworkError(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::NetworkError("Base URL cannot carry a path".to_string()))?
            .push(task_id.as_str());
        Ok(url)
    }

    fn stream_url(&self) -> String {
        format!("{}/api/reports/stream", self.config.base_url)
    }

    fn reports_url(&self) -> String {
        format!("{}/api/reports", self.config.base_url)
    }
}

/// reqwest 错误映射
fn map_send_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::NetworkError(format!("Cannot connect to diagnosis service: {}", e))
    } else {
        GatewayError::NetworkError(e.to_string())
    }
}

/// 非 2xx 响应转换为 HttpError
async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::HttpError {
        status: status.as_u16(),
        body,
    })
}

/// 按唯一约定的结构解析 JSON 响应体
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await.map_err(map_send_error)?;
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl DiagnosisApiPort for HttpDiagnosisClient {
    async fn submit_analysis(&self, request: SubmitAnalysisRequest) -> Result<TaskId, GatewayError> {
        let image = Part::bytes(request.image.bytes().to_vec())
            .file_name(request.image.file_name().to_string())
            .mime_str(request.image.mime_type())
            .map_err(|e| GatewayError::NetworkError(format!("Invalid image part: {}", e)))?;

        let mut form = Form::new()
            .part("image", image)
            .text("user_id", request.user_id.clone());
        if let Some(info) = &request.additional_info {
            let json = serde_json::to_string(info)
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            form = form.text("additional_info", json);
        }

        tracing::debug!(
            url = %self.tasks_url(),
            image_len = request.image.len(),
            has_questionnaire = request.additional_info.is_some(),
            "Submitting analysis task"
        );

        let response = self
            .client
            .post(self.tasks_url())
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        let body: SubmitTaskResponse = read_json(response).await?;
        let task_id = TaskId::try_from(body)?;
        tracing::info!(task_id = %task_id, "Analysis task submitted");
        Ok(task_id)
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<StatusObservation, GatewayError> {
        let response = self
            .client
            .get(self.task_url(task_id)?)
            .send()
            .await
            .map_err(map_send_error)?;

        let body: TaskStatusResponse = read_json(response).await?;
        let observation = StatusObservation::try_from(body)?;
        tracing::trace!(task_id = %task_id, state = %observation.state(), "Task status");
        Ok(observation)
    }

    async fn open_report_stream(
        &self,
        request: ReportStreamRequest,
    ) -> Result<ReportEventStream, GatewayError> {
        let query = ReportStreamQuery {
            user_id: &request.user_id,
            disease_name: &request.disease_name,
            task_id: request.task_id.as_str(),
        };

        tracing::debug!(
            url = %self.stream_url(),
            task_id = %request.task_id,
            disease_name = %request.disease_name,
            "Opening report stream"
        );

        let send = self
            .stream_client
            .get(self.stream_url())
            .query(&query)
            .header(ACCEPT, "text/event-stream")
            .send();
        let response = tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), send)
            .await
            .map_err(|_| GatewayError::Timeout)?
            .map_err(map_send_error)?;
        let response = check_status(response).await?;

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| GatewayError::StreamError(e.to_string())));
        Ok(decode_report_events(bytes))
    }

    async fn save_report(&self, record: DiagnosisRecord) -> Result<SavedReport, GatewayError> {
        tracing::debug!(
            url = %self.reports_url(),
            task_id = %record.task_id,
            "Saving diagnosis record"
        );

        let response = self
            .client
            .post(self.reports_url())
            .json(&record)
            .send()
            .await
            .map_err(map_send_error)?;

        let body: SaveReportResponse = read_json(response).await?;
        if body.report_id.trim().is_empty() {
            return Err(GatewayError::InvalidResponse("empty report_id".to_string()));
        }
        Ok(SavedReport {
            report_id: body.report_id,
        })
    }
}
