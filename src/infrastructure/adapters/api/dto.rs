//! Data Transfer Objects - 后端接口的线上格式
//!
//! 每个接口只接受一种响应结构，形状不符即 `InvalidResponse`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::ports::GatewayError;
use crate::domain::analysis::{AnalysisResult, StatusObservation, TaskId, TaskState};
use crate::domain::report::{ReportEvent, ReportSection};

// ============================================================================
// Analysis DTOs
// ============================================================================

/// POST /api/analysis/tasks 响应
#[derive(Debug, Deserialize)]
pub struct SubmitTaskResponse {
    pub task_id: String,
}

impl TryFrom<SubmitTaskResponse> for TaskId {
    type Error = GatewayError;

    fn try_from(dto: SubmitTaskResponse) -> Result<Self, Self::Error> {
        TaskId::new(dto.task_id).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

/// GET /api/analysis/tasks/{task_id} 响应
#[derive(Debug, Deserialize)]
pub struct TaskStatusResponse {
    pub state: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TryFrom<TaskStatusResponse> for StatusObservation {
    type Error = GatewayError;

    fn try_from(dto: TaskStatusResponse) -> Result<Self, Self::Error> {
        let state = TaskState::from_wire(&dto.state)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        // 只有 SUCCESS 的 result 有意义，其余状态携带的中间结果忽略
        let result = match (state, dto.result) {
            (TaskState::Success, Some(raw)) => Some(
                serde_json::from_value::<AnalysisResult>(raw)
                    .map_err(|e| GatewayError::InvalidResponse(format!("result: {}", e)))?,
            ),
            _ => None,
        };

        StatusObservation::new(state, result, dto.error)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

// ============================================================================
// Report DTOs
// ============================================================================

/// 推送通道 `data:` 载荷
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportEventPayload {
    Progress {
        tab: String,
        content: String,
    },
    Complete {},
    Error {
        #[serde(default)]
        message: Option<String>,
    },
}

impl TryFrom<ReportEventPayload> for ReportEvent {
    type Error = GatewayError;

    fn try_from(dto: ReportEventPayload) -> Result<Self, GatewayError> {
        match dto {
            ReportEventPayload::Progress { tab, content } => {
                let section = ReportSection::parse(&tab)
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
                Ok(ReportEvent::Progress { section, content })
            }
            ReportEventPayload::Complete {} => Ok(ReportEvent::Complete),
            ReportEventPayload::Error { message } => Ok(ReportEvent::Error {
                message: message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Report generation failed".to_string()),
            }),
        }
    }
}

/// 解析单条推送载荷
pub fn parse_report_event(data: &str) -> Result<ReportEvent, GatewayError> {
    let payload: ReportEventPayload = serde_json::from_str(data)
        .map_err(|e| GatewayError::InvalidResponse(format!("report event: {}", e)))?;
    ReportEvent::try_from(payload)
}

/// POST /api/reports 响应
#[derive(Debug, Deserialize)]
pub struct SaveReportResponse {
    pub report_id: String,
}

/// GET /api/reports/stream 查询参数
#[derive(Debug, Serialize)]
pub struct ReportStreamQuery<'a> {
    pub user_id: &'a str,
    pub disease_name: &'a str,
    pub task_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(value: Value) -> Result<StatusObservation, GatewayError> {
        let dto: TaskStatusResponse = serde_json::from_value(value).unwrap();
        StatusObservation::try_from(dto)
    }

    #[test]
    fn test_success_status_parses_result() {
        let obs = status(json!({
            "state": "SUCCESS",
            "result": {"disease_name": "Psoriasis", "confidence": 91.5, "top_k": []}
        }))
        .unwrap();
        assert_eq!(obs.state(), TaskState::Success);
    }

    #[test]
    fn test_started_reads_as_progress() {
        let obs = status(json!({"state": "STARTED"})).unwrap();
        assert_eq!(obs.state(), TaskState::Progress);
    }

    #[test]
    fn test_malformed_status_is_invalid_response() {
        assert!(matches!(
            status(json!({"state": "SUCCESS"})),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            status(json!({"state": "EXPLODED"})),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            status(json!({"state": "SUCCESS", "result": {"disease_name": "", "confidence": 3}})),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_failure_without_error_gets_message() {
        let obs = status(json!({"state": "FAILURE"})).unwrap();
        assert_eq!(obs.state(), TaskState::Failure);
        assert_eq!(obs, StatusObservation::failure("Analysis failed"));
    }

    #[test]
    fn test_parse_report_events() {
        assert_eq!(
            parse_report_event(r#"{"type":"progress","tab":"precautions","content":"Avoid soap."}"#)
                .unwrap(),
            ReportEvent::Progress {
                section: ReportSection::Precautions,
                content: "Avoid soap.".to_string()
            }
        );
        assert_eq!(
            parse_report_event(r#"{"type":"complete","result":{"ok":true}}"#).unwrap(),
            ReportEvent::Complete
        );
        assert_eq!(
            parse_report_event(r#"{"type":"error","message":"overloaded"}"#).unwrap(),
            ReportEvent::Error {
                message: "overloaded".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_tab_or_type_is_rejected() {
        assert!(matches!(
            parse_report_event(r#"{"type":"progress","tab":"diet","content":"x"}"#),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_report_event(r#"{"type":"heartbeat"}"#),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_report_event("not json"),
            Err(GatewayError::InvalidResponse(_))
        ));
    }
}
