//! Domain Layer - 领域层
//!
//! 包含四个限界上下文:
//! - Analysis Context: 后端分析任务
//! - Intake Context: 图片与症状问卷
//! - Report Context: 流式报告
//! - Wizard Context: 诊断向导状态

pub mod analysis;
pub mod intake;
pub mod report;
pub mod wizard;
