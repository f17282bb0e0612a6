//! Analysis Context - Errors

use thiserror::Error;

use super::{TaskId, TaskState};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("无效的任务 ID: {0}")]
    InvalidTaskId(String),

    #[error("无效的任务状态: {0}")]
    UnknownState(String),

    #[error("任务 {task_id} 已结束（{state:?}），不能再更新")]
    AlreadyTerminal { task_id: TaskId, state: TaskState },

    #[error("无效的分析结果: {0}")]
    InvalidResult(String),
}
