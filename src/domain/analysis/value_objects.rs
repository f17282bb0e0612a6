//! Analysis Context - Value Objects

use serde::{Deserialize, Serialize};

use super::AnalysisError;

/// 后端分配的任务句柄（不透明字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Result<Self, AnalysisError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(AnalysisError::InvalidTaskId("任务 ID 不能为空".to_string()));
        }
        if trimmed.contains('/') {
            return Err(AnalysisError::InvalidTaskId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 任务状态
///
/// 只允许 `Pending/Progress* -> Success | Failure` 单向演进
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// 已排队
    Pending,
    /// 分析中
    Progress,
    /// 分析成功
    Success,
    /// 分析失败
    Failure,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Progress => "PROGRESS",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
        }
    }

    /// 解析后端返回的状态字符串
    ///
    /// 后端基于 Celery，`STARTED` / `RETRY` 视为仍在进行中
    pub fn from_wire(s: &str) -> Result<Self, AnalysisError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskState::Pending),
            "PROGRESS" | "STARTED" | "RETRY" => Ok(TaskState::Progress),
            "SUCCESS" => Ok(TaskState::Success),
            "FAILURE" => Ok(TaskState::Failure),
            _ => Err(AnalysisError::UnknownState(s.to_string())),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
