//! Analysis Commands - 提交分析相关命令

use crate::domain::intake::{AdditionalInfo, ImageUpload};

/// 提交分析任务命令
///
/// image 为 None 表示用户尚未选择图片，校验阶段即被拒绝
#[derive(Debug, Clone)]
pub struct SubmitAnalysisCommand {
    pub image: Option<ImageUpload>,
    pub additional_info: Option<AdditionalInfo>,
}
