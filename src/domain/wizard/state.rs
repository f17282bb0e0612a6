//! Wizard Context - 状态机

use serde::Serialize;

/// 向导状态
///
/// `Upload -> Questionnaire -> Waiting -> Streaming -> Complete`，
/// Waiting / Streaming 可进入 Error；任意状态可 restart 回到 Upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum WizardState {
    Upload,
    Questionnaire,
    Waiting,
    Streaming,
    Complete,
    Error(String),
}

impl WizardState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Questionnaire => "questionnaire",
            Self::Waiting => "waiting",
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Error(_) => "error",
        }
    }

    /// 是否允许迁移到 next（restart 不经过此检查）
    pub fn can_transition_to(&self, next: &WizardState) -> bool {
        matches!(
            (self, next),
            (Self::Upload, Self::Questionnaire)
                | (Self::Questionnaire, Self::Waiting)
                | (Self::Waiting, Self::Streaming)
                | (Self::Waiting, Self::Error(_))
                | (Self::Streaming, Self::Complete)
                | (Self::Streaming, Self::Error(_))
        )
    }

    /// Complete 与 Error 之后只能 restart
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Complete | Self::Error(_))
    }
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(message) => write!(f, "error: {}", message),
            other => f.write_str(other.name()),
        }
    }
}
