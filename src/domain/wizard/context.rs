//! Wizard Context - 步骤间上下文

use crate::domain::analysis::{AnalysisResult, AnalysisTask};
use crate::domain::intake::{AdditionalInfo, ImageUpload};

/// 在向导步骤之间传递的值
///
/// 只由一个向导实例持有，restart 时整体清空
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardContext {
    pub image: Option<ImageUpload>,
    pub additional_info: Option<AdditionalInfo>,
    pub task: Option<AnalysisTask>,
}

impl WizardContext {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.additional_info.is_none() && self.task.is_none()
    }

    /// 已完成任务的分析结果
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.task.as_ref().and_then(|t| t.result())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
